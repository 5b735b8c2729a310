diesel::table! {
    users (id) {
        id -> Text,
        username -> Text,
        password_hash -> Text,
        email -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    conversations (id) {
        id -> Text,
        user_id -> Nullable<Text>,
        title -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    messages (id) {
        id -> Text,
        conversation_id -> Text,
        position -> Integer,
        sender -> Text,
        body -> Text,
        created_at -> Text,
    }
}

diesel::table! {
    sessions (token) {
        token -> Text,
        user_id -> Text,
        expires_at -> BigInt,
    }
}

diesel::joinable!(conversations -> users (user_id));
diesel::joinable!(messages -> conversations (conversation_id));
diesel::joinable!(sessions -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(users, conversations, messages, sessions);
