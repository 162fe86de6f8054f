//! The aggregation itself: a pure function from a recipe and a partial
//! ingredient map to a classified nutrition result.

use recipeline_core::config::NutritionConfig;
use recipeline_core::dto::RecipeNutritionsDto;
use recipeline_core::model::{Ingredient, NutritionFacts, Recipe};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NutritionError {
  /// Too little is known about the recipe's ingredients to say anything.
  /// Nothing is published for it.
  #[error("could not calculate nutrition facts: insufficient data ({unknown}/{total} ingredients unknown)")]
  InsufficientData { unknown: usize, total: usize },
}

#[derive(Debug, Clone)]
pub struct NutritionService {
  fail_threshold: f64,
  inaccurate_threshold: f64,
}

impl NutritionService {
  pub fn new(config: &NutritionConfig) -> Self {
    Self {
      fail_threshold: config.fail_threshold,
      inaccurate_threshold: config.inaccurate_threshold,
    }
  }

  /// Sum `amount × macro` over every recipe entry whose ingredient is
  /// known, annotated, and declared in the ingredient's base unit. No unit
  /// conversion is attempted: a mismatched unit counts as unknown, exactly
  /// like a missing ingredient.
  ///
  /// With `rate = unknown / entries`: above the fail threshold the whole
  /// operation fails; above the inaccurate threshold the totals are
  /// produced but flagged; otherwise the result is exact. A recipe with no
  /// entries is insufficient data, never a division by zero.
  pub fn calc_recipe_nutritions(
    &self,
    recipe: &Recipe,
    ingredients: &HashMap<String, Ingredient>,
  ) -> Result<RecipeNutritionsDto, NutritionError> {
    let total = recipe.ingredients.len();
    if total == 0 {
      return Err(NutritionError::InsufficientData { unknown: 0, total: 0 });
    }

    let mut facts = NutritionFacts::default();
    let mut unknown = 0usize;
    for entry in &recipe.ingredients {
      match ingredients.get(&entry.ingredient_id) {
        Some(ingredient) if ingredient.base_unit == entry.unit => match &ingredient.nutrition_facts {
          Some(per_unit) => {
            facts.calories += entry.amount * per_unit.calories;
            facts.proteins += entry.amount * per_unit.proteins;
            facts.fats += entry.amount * per_unit.fats;
            facts.carbohydrates += entry.amount * per_unit.carbohydrates;
          }
          None => unknown += 1,
        },
        _ => unknown += 1,
      }
    }

    let rate = unknown as f64 / total as f64;
    if rate > self.fail_threshold {
      return Err(NutritionError::InsufficientData { unknown, total });
    }

    Ok(RecipeNutritionsDto {
      recipe_id: recipe.id.clone(),
      nutrition_facts: facts,
      is_inaccurate: rate > self.inaccurate_threshold,
    })
  }
}

impl Default for NutritionService {
  fn default() -> Self {
    Self::new(&NutritionConfig::default())
  }
}
