//! Shared types for the recipeline backend: configuration, topic names,
//! the recipe/ingredient domain model and the wire DTOs exchanged over
//! the message log.

pub mod config;
pub mod dto;
pub mod model;
pub mod topics;

pub use config::{Config, KafkaConfig, NutritionConfig};
pub use dto::{FindIngredientDto, IngredientDto, RecipeDto, RecipeNutritionsDto};
pub use model::{Ingredient, NutritionFacts, Recipe, RecipeIngredient, RecipeStep};
