use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Highest ingredient slot number the API exposes (`strIngredient1..=20`).
const MAX_INGREDIENT_SLOTS: usize = 20;

/// A single ingredient line of a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub measure: String,
}

/// A full recipe record as returned by `search`, `lookup` and `random`.
///
/// Blank and `null` optional fields are normalised to `None`. The numbered
/// `strIngredientN` / `strMeasureN` columns are folded into `ingredients`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMeal")]
pub struct Meal {
    pub id: String,
    pub name: String,
    pub thumbnail: Option<String>,
    pub category: Option<String>,
    pub area: Option<String>,
    pub instructions: Option<String>,
    pub tags: Option<String>,
    pub youtube: Option<String>,
    pub source: Option<String>,
    pub ingredients: Vec<Ingredient>,
}

impl Meal {
    /// The stable dedup key, or `None` when the record carries no id.
    pub fn identity(&self) -> Option<&str> {
        let id = self.id.trim();
        (!id.is_empty()).then_some(id)
    }

    /// `"category | area"`, whichever single value is present, or `""`.
    pub fn category_area_label(&self) -> String {
        let category = self.category.as_deref().unwrap_or("").trim();
        let area = self.area.as_deref().unwrap_or("").trim();
        match (category.is_empty(), area.is_empty()) {
            (false, false) => format!("{category} | {area}"),
            (false, true) => category.to_string(),
            (true, false) => area.to_string(),
            (true, true) => String::new(),
        }
    }
}

/// Wire shape of a full recipe record.
#[derive(Deserialize)]
struct RawMeal {
    #[serde(rename = "idMeal", default)]
    id: Option<String>,
    #[serde(rename = "strMeal", default)]
    name: Option<String>,
    #[serde(rename = "strMealThumb", default)]
    thumbnail: Option<String>,
    #[serde(rename = "strCategory", default)]
    category: Option<String>,
    #[serde(rename = "strArea", default)]
    area: Option<String>,
    #[serde(rename = "strInstructions", default)]
    instructions: Option<String>,
    #[serde(rename = "strTags", default)]
    tags: Option<String>,
    #[serde(rename = "strYoutube", default)]
    youtube: Option<String>,
    #[serde(rename = "strSource", default)]
    source: Option<String>,
    #[serde(flatten)]
    rest: HashMap<String, serde_json::Value>,
}

impl From<RawMeal> for Meal {
    fn from(raw: RawMeal) -> Self {
        let slot = |prefix: &str, n: usize| {
            raw.rest
                .get(&format!("{prefix}{n}"))
                .and_then(|v| v.as_str())
                .map(str::trim)
                .unwrap_or("")
                .to_string()
        };

        let ingredients = (1..=MAX_INGREDIENT_SLOTS)
            .filter_map(|n| {
                let name = slot("strIngredient", n);
                (!name.is_empty()).then(|| Ingredient {
                    name,
                    measure: slot("strMeasure", n),
                })
            })
            .collect();

        Meal {
            id: raw.id.unwrap_or_default().trim().to_string(),
            name: raw.name.unwrap_or_default(),
            thumbnail: non_blank(raw.thumbnail),
            category: non_blank(raw.category),
            area: non_blank(raw.area),
            instructions: non_blank(raw.instructions),
            tags: non_blank(raw.tags),
            youtube: non_blank(raw.youtube),
            source: non_blank(raw.source),
            ingredients,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A partial recipe record as returned by `filter.php`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealSummary {
    #[serde(rename = "idMeal")]
    pub id: String,
    #[serde(rename = "strMeal", default)]
    pub name: String,
    #[serde(rename = "strMealThumb", default)]
    pub thumbnail: Option<String>,
}

/// A recipe category as returned by `categories.php`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "idCategory", default)]
    pub id: String,
    #[serde(rename = "strCategory", default)]
    pub name: String,
    #[serde(rename = "strCategoryThumb", default)]
    pub thumbnail: Option<String>,
    #[serde(rename = "strCategoryDescription", default)]
    pub description: Option<String>,
}

/// `{ "meals": [...] | null }`
#[derive(Debug, Deserialize)]
pub struct MealsEnvelope<T> {
    pub meals: Option<Vec<T>>,
}

/// `{ "categories": [...] }`
#[derive(Debug, Deserialize)]
pub struct CategoriesEnvelope {
    pub categories: Option<Vec<Category>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_meal_parses_ingredients() {
        let json = serde_json::json!({
            "idMeal": "52772",
            "strMeal": "Teriyaki Chicken Casserole",
            "strMealThumb": "https://www.themealdb.com/images/media/meals/wvpsxx1468256321.jpg",
            "strCategory": "Chicken",
            "strArea": "Japanese",
            "strTags": "Meat,Casserole",
            "strYoutube": "",
            "strSource": null,
            "strIngredient1": "soy sauce",
            "strMeasure1": "3/4 cup",
            "strIngredient2": " water ",
            "strMeasure2": null,
            "strIngredient3": "",
            "strMeasure3": "",
            "strIngredient4": null
        });

        let meal: Meal = serde_json::from_value(json).unwrap();
        assert_eq!(meal.identity(), Some("52772"));
        assert_eq!(meal.youtube, None);
        assert_eq!(meal.source, None);
        assert_eq!(
            meal.ingredients,
            vec![
                Ingredient {
                    name: "soy sauce".into(),
                    measure: "3/4 cup".into()
                },
                Ingredient {
                    name: "water".into(),
                    measure: String::new()
                },
            ]
        );
    }

    #[test]
    fn test_meal_without_id_has_no_identity() {
        let meal: Meal = serde_json::from_value(serde_json::json!({"strMeal": "Ghost"})).unwrap();
        assert_eq!(meal.identity(), None);

        let meal: Meal =
            serde_json::from_value(serde_json::json!({"idMeal": "  ", "strMeal": "Blank"}))
                .unwrap();
        assert_eq!(meal.identity(), None);
    }

    #[test]
    fn test_null_meals_envelope() {
        let env: MealsEnvelope<Meal> = serde_json::from_str(r#"{"meals": null}"#).unwrap();
        assert!(env.meals.is_none());

        let env: MealsEnvelope<MealSummary> = serde_json::from_str("{}").unwrap();
        assert!(env.meals.is_none());
    }

    #[test]
    fn test_category_area_label() {
        let mut meal: Meal =
            serde_json::from_value(serde_json::json!({"idMeal": "1", "strMeal": "x"})).unwrap();
        assert_eq!(meal.category_area_label(), "");

        meal.category = Some("Dessert".into());
        assert_eq!(meal.category_area_label(), "Dessert");

        meal.area = Some("French".into());
        assert_eq!(meal.category_area_label(), "Dessert | French");

        meal.category = None;
        assert_eq!(meal.category_area_label(), "French");
    }

    #[test]
    fn test_category_parses() {
        let json = r#"{"categories":[{"idCategory":"1","strCategory":"Beef","strCategoryThumb":"https://x/beef.png","strCategoryDescription":"Beef is..."}]}"#;
        let env: CategoriesEnvelope = serde_json::from_str(json).unwrap();
        let cats = env.categories.unwrap();
        assert_eq!(cats[0].name, "Beef");
    }
}
