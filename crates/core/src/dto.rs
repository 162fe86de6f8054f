//! Wire DTOs.
//!
//! Business failures travel inside the response DTO's `error` field; the
//! transport never signals them out-of-band. Absent fields are real
//! `Option`s rather than empty-string sentinels.

use crate::model::{Ingredient, NutritionFacts, Recipe};
use serde::{Deserialize, Serialize};

/// Lookup request for one ingredient, keyed by the ingredient id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FindIngredientDto {
  pub ingredient_id: String,
}

/// Lookup response. Exactly one of `ingredient` and `error` is expected
/// to be present; a response with neither counts as unknown data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientDto {
  pub ingredient_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ingredient: Option<Ingredient>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl IngredientDto {
  pub fn found(ingredient: Ingredient) -> Self {
    Self {
      ingredient_id: ingredient.id.clone(),
      ingredient: Some(ingredient),
      error: None,
    }
  }

  pub fn failed(ingredient_id: impl Into<String>, error: impl Into<String>) -> Self {
    Self {
      ingredient_id: ingredient_id.into(),
      ingredient: None,
      error: Some(error.into()),
    }
  }
}

/// A recipe event, published when a recipe is created or found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDto {
  pub recipe_id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub recipe: Option<Recipe>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl RecipeDto {
  pub fn new(recipe: Recipe) -> Self {
    Self {
      recipe_id: recipe.id.clone(),
      recipe: Some(recipe),
      error: None,
    }
  }
}

/// The aggregated nutrition result for one recipe, keyed by the recipe id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeNutritionsDto {
  pub recipe_id: String,
  pub nutrition_facts: NutritionFacts,
  pub is_inaccurate: bool,
}
