pub mod health;
pub mod links;

pub use health::ping_handler;
pub use links::{
    delete_user_urls_handler, list_user_urls_handler, redirect_handler, shorten_batch_handler,
    shorten_json_handler, shorten_text_handler,
};
