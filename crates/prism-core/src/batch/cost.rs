//! Cost estimation for a batch's job list.

use crate::batch::types::JobSpec;
use serde::Serialize;
use std::collections::BTreeMap;

/// Model used when neither the job nor the batch names one, and whose pricing
/// applies to unrecognized model identifiers.
pub const DEFAULT_MODEL: &str = "grok-imagine-image";

/// Pricing of a single model in USD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    /// Charged for every generated image.
    pub base_cost_per_image: f64,
    /// Charged once for every edit job.
    pub edit_surcharge_per_job: f64,
}

const DEFAULT_PRICING: ModelPricing =
    ModelPricing { base_cost_per_image: 0.02, edit_surcharge_per_job: 0.002 };

const PRICE_TABLE: &[(&str, ModelPricing)] = &[
    (DEFAULT_MODEL, DEFAULT_PRICING),
    ("grok-2-image", ModelPricing { base_cost_per_image: 0.07, edit_surcharge_per_job: 0.0 }),
    ("grok-2-image-1212", ModelPricing { base_cost_per_image: 0.07, edit_surcharge_per_job: 0.0 }),
];

/// Look up pricing, falling back to the default model's.
pub fn pricing_for(model: &str) -> ModelPricing {
    PRICE_TABLE
        .iter()
        .find(|(id, _)| *id == model)
        .map_or(DEFAULT_PRICING, |(_, pricing)| *pricing)
}

/// Whether `model` has its own entry in the price table.
pub fn is_known_model(model: &str) -> bool {
    PRICE_TABLE.iter().any(|(id, _)| *id == model)
}

/// Cost of one (model, edit) group.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdownEntry {
    /// Effective model of the group's jobs.
    pub model: String,
    /// Whether the group holds edit jobs.
    pub is_edit: bool,
    /// Number of jobs in the group.
    pub job_count: usize,
    /// Images requested across the group.
    pub image_count: u32,
    /// Lower bound of the group's cost.
    pub cost_min: f64,
    /// Upper bound of the group's cost.
    pub cost_max: f64,
}

/// Cost estimate for a job list.
///
/// Pricing is deterministic today, so every min equals its max; the pair
/// leaves room for pricing ranges without changing the shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    /// Number of jobs.
    pub total_jobs: usize,
    /// Images requested across all jobs.
    pub total_images: u32,
    /// One entry per (model, edit) pairing, ordered by model then kind.
    pub breakdown: Vec<CostBreakdownEntry>,
    /// Sum of group minimums.
    pub estimated_cost_min: f64,
    /// Sum of group maximums.
    pub estimated_cost_max: f64,
}

/// Estimate the cost of `jobs`, resolving missing models to `default_model`.
pub fn estimate(jobs: &[JobSpec], default_model: &str) -> CostEstimate {
    let mut groups: BTreeMap<(&str, bool), (usize, u32)> = BTreeMap::new();
    for job in jobs {
        let entry = groups.entry((job.effective_model(default_model), job.is_edit())).or_default();
        entry.0 += 1;
        entry.1 += u32::from(job.image_count);
    }

    let breakdown: Vec<CostBreakdownEntry> = groups
        .into_iter()
        .map(|((model, is_edit), (job_count, image_count))| {
            let pricing = pricing_for(model);
            let mut cost = pricing.base_cost_per_image * f64::from(image_count);
            if is_edit {
                cost += pricing.edit_surcharge_per_job * job_count as f64;
            }
            CostBreakdownEntry {
                model: model.to_string(),
                is_edit,
                job_count,
                image_count,
                cost_min: cost,
                cost_max: cost,
            }
        })
        .collect();

    CostEstimate {
        total_jobs: jobs.len(),
        total_images: breakdown.iter().map(|e| e.image_count).sum(),
        estimated_cost_min: breakdown.iter().map(|e| e.cost_min).sum(),
        estimated_cost_max: breakdown.iter().map(|e| e.cost_max).sum(),
        breakdown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_abstraction::ImageSource;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_generate_and_edit_mix() {
        let jobs = vec![
            JobSpec::generate("a", "a.png").with_model(DEFAULT_MODEL).with_image_count(2),
            JobSpec::edit("b", ImageSource::Url("https://x/y.png".to_string()), "b.png")
                .with_model(DEFAULT_MODEL),
        ];

        let estimate = estimate(&jobs, DEFAULT_MODEL);

        assert_eq!(estimate.total_jobs, 2);
        assert_eq!(estimate.total_images, 3);
        assert!(approx_eq(estimate.estimated_cost_min, 0.062));
        assert!(approx_eq(estimate.estimated_cost_max, 0.062));
        assert_eq!(estimate.breakdown.len(), 2);
        assert!(!estimate.breakdown[0].is_edit);
        assert!(approx_eq(estimate.breakdown[0].cost_min, 0.04));
        assert!(estimate.breakdown[1].is_edit);
        assert!(approx_eq(estimate.breakdown[1].cost_max, 0.022));
    }

    #[test]
    fn test_unknown_model_uses_default_pricing() {
        assert_eq!(pricing_for("grok-imagine-experimental"), pricing_for(DEFAULT_MODEL));
        assert!(!is_known_model("grok-imagine-experimental"));

        let jobs = vec![JobSpec::generate("a", "a.png").with_model("grok-imagine-experimental")];
        let estimate = estimate(&jobs, DEFAULT_MODEL);
        assert_eq!(estimate.breakdown[0].model, "grok-imagine-experimental");
        assert!(approx_eq(estimate.estimated_cost_min, 0.02));
    }

    #[test]
    fn test_jobs_without_override_group_under_default() {
        let jobs = vec![
            JobSpec::generate("a", "a.png"),
            JobSpec::generate("b", "b.png").with_model("grok-2-image").with_image_count(3),
            JobSpec::generate("c", "c.png").with_image_count(4),
        ];

        let estimate = estimate(&jobs, "grok-2-image");

        assert_eq!(estimate.breakdown.len(), 1);
        assert_eq!(estimate.breakdown[0].job_count, 3);
        assert_eq!(estimate.breakdown[0].image_count, 8);
        assert!(approx_eq(estimate.estimated_cost_min, 0.56));
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let jobs = vec![
            JobSpec::generate("a", "a.png").with_model("grok-2-image"),
            JobSpec::generate("b", "b.png"),
            JobSpec::edit("c", ImageSource::Base64("aGk=".to_string()), "c.png"),
        ];
        assert_eq!(estimate(&jobs, DEFAULT_MODEL), estimate(&jobs, DEFAULT_MODEL));
    }

    #[test]
    fn test_empty_job_list() {
        let estimate = estimate(&[], DEFAULT_MODEL);
        assert_eq!(estimate.total_jobs, 0);
        assert!(estimate.breakdown.is_empty());
        assert!(approx_eq(estimate.estimated_cost_max, 0.0));
    }
}
