table! {
    auth_identity (id) {
        id -> Uuid,
        email -> Varchar,
        password_hash -> Varchar,
        last_password_change -> Timestamptz,
        created_at -> Timestamptz,
    }
}

table! {
    nodes (id) {
        id -> Int4,
        user_id -> Uuid,
        user_email -> Varchar,
        phone -> Varchar,
        node_id -> Varchar,
        location -> Varchar,
        total_sensors -> Int4,
        status -> Varchar,
        created_at -> Timestamptz,
    }
}

table! {
    sensors (id) {
        id -> Int4,
        node_id -> Varchar,
        sensor_name -> Varchar,
        sensor_type -> Nullable<Varchar>,
        sensor_value -> Nullable<Varchar>,
        unit -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

table! {
    users (id) {
        id -> Uuid,
        userid -> Varchar,
        email -> Varchar,
        phoneno -> Varchar,
        role -> Varchar,
        createdat -> Timestamptz,
        passwordresetat -> Nullable<Timestamptz>,
    }
}

allow_tables_to_appear_in_same_query!(
    auth_identity,
    nodes,
    sensors,
    users,
);
