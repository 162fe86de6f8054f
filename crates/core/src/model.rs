//! Recipe and ingredient domain model.

use serde::{Deserialize, Serialize};

/// Macro quantities per one base unit of an ingredient, or aggregated
/// for a whole recipe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
  pub calories: f64,
  pub proteins: f64,
  pub fats: f64,
  pub carbohydrates: f64,
}

impl NutritionFacts {
  pub fn new(calories: f64, proteins: f64, fats: f64, carbohydrates: f64) -> Self {
    Self {
      calories,
      proteins,
      fats,
      carbohydrates,
    }
  }
}

/// An ingredient as the ingredient service publishes it. Nutrition facts
/// are optional: some ingredients are never annotated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
  pub id: String,
  #[serde(default)]
  pub name: String,
  pub base_unit: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub nutrition_facts: Option<NutritionFacts>,
}

/// One `(ingredient, unit, amount)` entry of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeIngredient {
  #[serde(rename = "ingredient")]
  pub ingredient_id: String,
  pub unit: String,
  pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeStep {
  pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub created_by: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub ingredients: Vec<RecipeIngredient>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub steps: Vec<RecipeStep>,
  /// Absent until the nutrition service has computed it.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub nutrition_facts: Option<NutritionFacts>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ingredient_without_facts_roundtrip() {
    let json = r#"{"id":"42","name":"salt","base_unit":"г"}"#;
    let ingredient: Ingredient = serde_json::from_str(json).unwrap();
    assert_eq!(ingredient.id, "42");
    assert!(ingredient.nutrition_facts.is_none());

    let out = serde_json::to_string(&ingredient).unwrap();
    assert!(!out.contains("nutrition_facts"));
  }

  #[test]
  fn test_recipe_ingredient_field_name() {
    let entry = RecipeIngredient {
      ingredient_id: "abc".to_string(),
      unit: "мл".to_string(),
      amount: 65.0,
    };
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["ingredient"], "abc");
    assert!(json.get("ingredient_id").is_none());
  }

  #[test]
  fn test_recipe_defaults() {
    let recipe: Recipe = serde_json::from_str(r#"{"id":"1"}"#).unwrap();
    assert!(recipe.ingredients.is_empty());
    assert!(recipe.steps.is_empty());
    assert!(recipe.nutrition_facts.is_none());
  }
}
