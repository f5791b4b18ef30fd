use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use macro_meal_planner::config::LpSettings;
use macro_meal_planner::models::{IngredientType, MacroVector, MealType};
use macro_meal_planner::planner::lp::{optimize_quantities, IngredientConstraint, LpInput};

const TYPES: [IngredientType; 4] = [
    IngredientType::FoMakro,
    IngredientType::Kiegeszito,
    IngredientType::Izesito,
    IngredientType::Kotott,
];

fn random_input(rng: &mut StdRng) -> LpInput {
    let count = rng.gen_range(2..9);
    let constraints: Vec<IngredientConstraint> = (0..count)
        .map(|i| {
            let ingredient_type = TYPES[rng.gen_range(0..TYPES.len())];
            let (min_scale_factor, max_scale_factor) = ingredient_type.default_scale_range();
            let binding_group = match rng.gen_range(0..4) {
                0 => Some("g1".to_string()),
                1 => Some("g2".to_string()),
                _ => None,
            };
            let per_gram = MacroVector::from_grams(
                rng.gen_range(0.0..30.0),
                rng.gen_range(0.0..80.0),
                rng.gen_range(0.0..40.0),
            ) * 0.01;
            IngredientConstraint {
                ingredient_id: format!("ing-{}", i),
                recipe_id: "r1".to_string(),
                meal_type: MealType::Ebed,
                per_gram,
                base_quantity: rng.gen_range(20.0..250.0),
                min_scale_factor,
                max_scale_factor,
                binding_group,
                ingredient_type,
                dominant_scalability: rng.gen_range(0.0..1.0),
            }
        })
        .collect();

    let base: MacroVector = constraints.iter().map(|c| c.base_contribution()).sum();
    let target = MacroVector::new(
        base.protein * rng.gen_range(0.7..1.3),
        base.carbs * rng.gen_range(0.7..1.3),
        base.fat * rng.gen_range(0.7..1.3),
        base.calories * rng.gen_range(0.7..1.3),
    );

    LpInput {
        constraints,
        fixed_macros: MacroVector::zero(),
        target,
    }
}

#[test]
fn test_random_instances_respect_bounds_and_groups() {
    let mut rng = StdRng::seed_from_u64(2024);
    let settings = LpSettings {
        limit_pure_macro_calories: false,
        ..Default::default()
    };
    let mut solved = 0;

    for _ in 0..100 {
        let input = random_input(&mut rng);
        let result = optimize_quantities(&input, &settings);
        if !result.success {
            continue;
        }
        solved += 1;
        assert_eq!(result.optimized_quantities.len(), input.constraints.len());

        for (q, c) in result.optimized_quantities.iter().map(|q| {
            let c = input
                .constraints
                .iter()
                .find(|c| c.ingredient_id == q.ingredient_id)
                .unwrap();
            (q, c)
        }) {
            let upper = c.effective_upper(input.target.calories);
            assert!(q.optimized_quantity >= q.original_quantity * c.min_scale_factor - 1e-9);
            assert!(q.optimized_quantity <= q.original_quantity * upper + 1e-9);
        }

        for group in ["g1", "g2"] {
            let factors: Vec<f64> = result
                .optimized_quantities
                .iter()
                .filter(|q| q.binding_group.as_deref() == Some(group))
                .map(|q| q.scale_factor)
                .collect();
            assert!(factors.windows(2).all(|w| w[0] == w[1]));
        }
    }

    assert!(solved > 50, "only {} of 100 instances solved", solved);
}

#[test]
fn test_optimized_macros_match_quantities() {
    let mut rng = StdRng::seed_from_u64(99);
    let input = random_input(&mut rng);
    let result = optimize_quantities(&input, &LpSettings::default());
    if !result.success {
        return;
    }
    let recomputed: MacroVector = result
        .optimized_quantities
        .iter()
        .map(|q| {
            let c = input
                .constraints
                .iter()
                .find(|c| c.ingredient_id == q.ingredient_id)
                .unwrap();
            c.per_gram * q.optimized_quantity
        })
        .sum();
    assert!((recomputed.calories - result.optimized_macros.calories).abs() < 1e-6);
    assert!((recomputed.protein - result.optimized_macros.protein).abs() < 1e-6);
}
