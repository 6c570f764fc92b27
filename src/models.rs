use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RecipeParams {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub amount: String,
}

/// The full response contract returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub ingredients: Vec<Ingredient>,
}
