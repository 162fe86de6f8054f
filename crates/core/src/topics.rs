//! Topic names shared by every service.
//!
//! A `*.req` topic carries requests; the paired topic without the suffix
//! carries the responses (or, for `new`, creation events).

pub const REGISTRATION_REQ: &str = "user.registration.req";
pub const REGISTRATIONS: &str = "user.registrations";
pub const LOGIN_REQ: &str = "user.login.req";
pub const LOGINS: &str = "user.logins";

pub const INGREDIENTS_NEW: &str = "ingredients.new";
pub const INGREDIENTS_REQ: &str = "ingredients.req";
pub const INGREDIENTS: &str = "ingredients";

pub const RECIPES_NEW: &str = "recipes.new";
pub const RECIPES_REQ: &str = "recipes.req";
pub const RECIPES: &str = "recipes";

pub const NUTRITION_FACTS: &str = "nutrition.facts";

/// Every topic the nutrition workflow touches, for topic creation at startup.
pub const NUTRITION_WORKFLOW: &[&str] = &[RECIPES, INGREDIENTS_REQ, INGREDIENTS, NUTRITION_FACTS];
