mod admin;
mod helpers;
mod lists;
mod recipe;
mod search;

pub(crate) use admin::{cmd_import, cmd_seed};
pub(crate) use lists::{
    cmd_favorites_add, cmd_favorites_list, cmd_favorites_remove, cmd_favorites_toggle,
    cmd_shopping_add, cmd_shopping_clear, cmd_shopping_list, cmd_shopping_remove,
    cmd_shopping_toggle,
};
pub(crate) use recipe::{cmd_recipe_batch, cmd_recipe_show, cmd_timer_record, cmd_timer_show};
pub(crate) use search::{cmd_normalize, cmd_search, cmd_suggest, cmd_suggest_watch};
