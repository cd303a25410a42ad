table! {
    comments (id) {
        id -> Int4,
        body -> Text,
        timestamp -> Timestamp,
        disabled -> Bool,
        author_id -> Int4,
        post_id -> Int4,
    }
}

table! {
    focus (user_id, post_id) {
        user_id -> Int4,
        post_id -> Int4,
    }
}

table! {
    follows (follower_id, followed_id) {
        follower_id -> Int4,
        followed_id -> Int4,
        timestamp -> Timestamp,
    }
}

table! {
    posts (id) {
        id -> Int4,
        body -> Text,
        body_html -> Nullable<Text>,
        timestamp -> Timestamp,
        author_id -> Int4,
        question_id -> Nullable<Int4>,
    }
}

table! {
    question_focus (user_id, question_id) {
        user_id -> Int4,
        question_id -> Int4,
    }
}

table! {
    questions (id) {
        id -> Int4,
        title -> Varchar,
        body -> Text,
        timestamp -> Timestamp,
        author_id -> Int4,
    }
}

table! {
    roles (id) {
        id -> Int4,
        name -> Varchar,
        permissions -> Array<crate::user::PermissionMapping>,
        is_default -> Bool,
    }
}

table! {
    sessions (id) {
        id -> Varchar,
        user_id -> Int4,
        expires -> Timestamp,
    }
}

table! {
    users (id) {
        id -> Int4,
        username -> Varchar,
        email -> Varchar,
        role_id -> Int4,
        name -> Nullable<Varchar>,
        location -> Nullable<Varchar>,
        about_me -> Nullable<Text>,
        member_since -> Timestamp,
    }
}

joinable!(comments -> posts (post_id));
joinable!(comments -> users (author_id));
joinable!(focus -> posts (post_id));
joinable!(focus -> users (user_id));
joinable!(posts -> questions (question_id));
joinable!(posts -> users (author_id));
joinable!(question_focus -> questions (question_id));
joinable!(question_focus -> users (user_id));
joinable!(questions -> users (author_id));
joinable!(sessions -> users (user_id));
joinable!(users -> roles (role_id));

allow_tables_to_appear_in_same_query!(
    comments,
    focus,
    follows,
    posts,
    question_focus,
    questions,
    roles,
    sessions,
    users,
);
