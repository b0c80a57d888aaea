//! Built-in recipes used when the API cannot fill a batch.

use std::collections::HashSet;

use crate::models::{Ingredient, Meal};

fn ingredient(name: &str, measure: &str) -> Ingredient {
    Ingredient {
        name: name.to_string(),
        measure: measure.to_string(),
    }
}

fn recipe(
    id: &str,
    name: &str,
    thumbnail: &str,
    category: &str,
    area: &str,
    instructions: &str,
    ingredients: Vec<Ingredient>,
) -> Meal {
    Meal {
        id: id.to_string(),
        name: name.to_string(),
        thumbnail: Some(thumbnail.to_string()),
        category: Some(category.to_string()),
        area: Some(area.to_string()),
        instructions: Some(instructions.to_string()),
        tags: None,
        youtube: None,
        source: None,
        ingredients,
    }
}

/// The fixed offline set, in display order.
///
/// Thumbnails are hosted images, so they can be preloaded like any API result.
pub fn fallback_recipes() -> Vec<Meal> {
    vec![
        recipe(
            "fallback-1",
            "Classic Spaghetti Carbonara",
            "https://images.unsplash.com/photo-1621996346565-e3dbc353d2e5?w=400&h=300&fit=crop",
            "Pasta",
            "Italian",
            "Cook pasta according to package directions. Mix eggs, cheese, and pepper. \
             Combine with hot pasta and pancetta.",
            vec![
                ingredient("Spaghetti", "200g"),
                ingredient("Eggs", "2"),
                ingredient("Parmesan", "50g"),
                ingredient("Pancetta", "100g"),
                ingredient("Black Pepper", "To taste"),
            ],
        ),
        recipe(
            "fallback-2",
            "Chicken Stir Fry",
            "https://images.unsplash.com/photo-1603133872878-684f208fb84b?w=400&h=300&fit=crop",
            "Chicken",
            "Chinese",
            "Heat oil in wok, add chicken and vegetables. Stir fry until cooked. \
             Add sauce and serve over rice.",
            vec![
                ingredient("Chicken Breast", "2"),
                ingredient("Mixed Vegetables", "300g"),
                ingredient("Soy Sauce", "3 tbs"),
                ingredient("Vegetable Oil", "1 tbs"),
                ingredient("Rice", "To serve"),
            ],
        ),
        recipe(
            "fallback-3",
            "Caesar Salad",
            "https://images.unsplash.com/photo-1546793665-c74683f339c1?w=400&h=300&fit=crop",
            "Miscellaneous",
            "American",
            "Toss romaine lettuce with caesar dressing, croutons, and parmesan cheese.",
            vec![
                ingredient("Romaine Lettuce", "1 head"),
                ingredient("Caesar Dressing", "4 tbs"),
                ingredient("Croutons", "Handful"),
                ingredient("Parmesan", "30g"),
            ],
        ),
    ]
}

/// Thumbnails of the fallback set, for warming before they are needed.
pub fn fallback_thumbnails() -> Vec<String> {
    fallback_recipes()
        .into_iter()
        .filter_map(|m| m.thumbnail)
        .collect()
}

/// Top `items` up to `target` with fallback recipes not already present.
///
/// Returns how many were added. Never removes or reorders existing items.
pub fn fill_with_fallback(items: &mut Vec<Meal>, target: usize) -> usize {
    if items.len() >= target {
        return 0;
    }

    let present: HashSet<String> = items
        .iter()
        .filter_map(|m| m.identity().map(str::to_owned))
        .collect();
    let missing = target - items.len();

    let extra: Vec<Meal> = fallback_recipes()
        .into_iter()
        .filter(|m| !present.contains(&m.id))
        .take(missing)
        .collect();

    let added = extra.len();
    if added > 0 {
        tracing::info!(added, target, "Topping up batch with fallback recipes");
    }
    items.extend(extra);
    added
}
