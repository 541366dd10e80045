// @generated manually, mirrors migrations/00000000000001_create_schema.

diesel::table! {
    events (id) {
        id -> Text,
        venue -> Text,
        slug_or_ticker -> Text,
        title -> Text,
        start_time -> Text,
        end_time -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    markets (id) {
        id -> Text,
        venue -> Text,
        ticker_or_token -> Text,
        title -> Text,
        resolution_source -> Text,
        open_time -> Text,
        close_time -> Text,
        category -> Nullable<Text>,
        binary_flag -> Bool,
        event_id -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    market_pairs (id) {
        id -> Text,
        market_a_id -> Text,
        market_b_id -> Text,
        llm_score -> Double,
        rules_passed -> Bool,
        active_flag -> Bool,
        window_open -> Nullable<Text>,
        window_close -> Nullable<Text>,
        window_resolution -> Nullable<Text>,
        last_validated -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    orderbooks (id) {
        id -> Nullable<Integer>,
        market_id -> Text,
        ts -> Text,
        bid_px -> Text,
        bid_sz -> Text,
        ask_px -> Text,
        ask_sz -> Text,
        lvl2_json -> Text,
    }
}

diesel::table! {
    edges (id) {
        id -> Nullable<Integer>,
        pair_id -> Text,
        ts -> Text,
        net_edge_cents -> Double,
        leader -> Nullable<Text>,
        signal_conf -> Nullable<Double>,
        fee_rev_hash -> Nullable<Text>,
    }
}

diesel::table! {
    orders (id) {
        id -> Text,
        venue -> Text,
        market_id -> Text,
        side -> Text,
        px -> Text,
        qty -> Text,
        ts_sent -> Text,
        ts_ack -> Nullable<Text>,
        status -> Text,
    }
}

diesel::table! {
    fills (id) {
        id -> Nullable<Integer>,
        order_id -> Text,
        px -> Text,
        qty -> Text,
        ts_fill -> Text,
        fee -> Nullable<Text>,
        slippage_cents -> Nullable<Double>,
    }
}

diesel::table! {
    positions (id) {
        id -> Nullable<Integer>,
        venue -> Text,
        market_id -> Text,
        qty_yes -> Text,
        qty_no -> Text,
        avg_px_yes -> Nullable<Text>,
        avg_px_no -> Nullable<Text>,
        created_at -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    configs (key, version) {
        key -> Text,
        version -> Integer,
        val -> Text,
        ts -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    events,
    markets,
    market_pairs,
    orderbooks,
    edges,
    orders,
    fills,
    positions,
    configs,
);
