//! Farm resource calculator.
//!
//! Deterministic per-hectare requirement math for seeds, fertilizer, water
//! and labor, with soil and irrigation multipliers, plus AI narratives for
//! optimization, irrigation scheduling and fertilizer programs.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

use khula_advisor::{AdvisorClient, AdvisorError};

/// Fertilizer costs in ZAR per kg.
const NITROGEN_COST_PER_KG: f64 = 12.0;
const PHOSPHORUS_COST_PER_KG: f64 = 15.0;
const POTASSIUM_COST_PER_KG: f64 = 18.0;

/// Water cost in ZAR per mm applied.
const WATER_COST_PER_MM: f64 = 2.5;

/// Labor cost in ZAR per hour.
const LABOR_COST_PER_HOUR: f64 = 25.0;

/// Per-hectare requirements for one crop.
#[derive(Debug, Clone, Copy)]
pub struct CropRequirements {
    pub crop: &'static str,
    pub seeds_kg_per_ha: f64,
    pub seed_cost_per_kg: f64,
    pub nitrogen_kg_per_ha: f64,
    pub phosphorus_kg_per_ha: f64,
    pub potassium_kg_per_ha: f64,
    pub water_mm_per_season: f64,
    pub labor_hours_per_ha: f64,
}

/// Requirement table for the crops the calculator covers.
pub const CROP_REQUIREMENTS: &[CropRequirements] = &[
    CropRequirements {
        crop: "maize",
        seeds_kg_per_ha: 25.0,
        seed_cost_per_kg: 45.0,
        nitrogen_kg_per_ha: 120.0,
        phosphorus_kg_per_ha: 60.0,
        potassium_kg_per_ha: 40.0,
        water_mm_per_season: 600.0,
        labor_hours_per_ha: 40.0,
    },
    CropRequirements {
        crop: "wheat",
        seeds_kg_per_ha: 120.0,
        seed_cost_per_kg: 8.0,
        nitrogen_kg_per_ha: 100.0,
        phosphorus_kg_per_ha: 40.0,
        potassium_kg_per_ha: 30.0,
        water_mm_per_season: 450.0,
        labor_hours_per_ha: 35.0,
    },
    CropRequirements {
        // Nitrogen need is low thanks to nitrogen fixation
        crop: "soybeans",
        seeds_kg_per_ha: 60.0,
        seed_cost_per_kg: 35.0,
        nitrogen_kg_per_ha: 20.0,
        phosphorus_kg_per_ha: 80.0,
        potassium_kg_per_ha: 60.0,
        water_mm_per_season: 500.0,
        labor_hours_per_ha: 45.0,
    },
    CropRequirements {
        crop: "potatoes",
        seeds_kg_per_ha: 2500.0,
        seed_cost_per_kg: 4.0,
        nitrogen_kg_per_ha: 150.0,
        phosphorus_kg_per_ha: 100.0,
        potassium_kg_per_ha: 200.0,
        water_mm_per_season: 700.0,
        labor_hours_per_ha: 80.0,
    },
    CropRequirements {
        // High-value hybrid seed
        crop: "tomatoes",
        seeds_kg_per_ha: 0.3,
        seed_cost_per_kg: 2500.0,
        nitrogen_kg_per_ha: 200.0,
        phosphorus_kg_per_ha: 120.0,
        potassium_kg_per_ha: 250.0,
        water_mm_per_season: 800.0,
        labor_hours_per_ha: 120.0,
    },
];

/// Soil quality classes with their fertilizer multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SoilType {
    Poor,
    #[default]
    Medium,
    Rich,
}

impl SoilType {
    /// Fertilizer adjustment for this soil class.
    pub fn fertilizer_multiplier(self) -> f64 {
        match self {
            Self::Poor => 1.3,
            Self::Medium => 1.0,
            Self::Rich => 0.8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Poor => "poor",
            Self::Medium => "medium",
            Self::Rich => "rich",
        }
    }
}

/// Irrigation methods with their water-use multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IrrigationType {
    #[default]
    Drip,
    Sprinkler,
    Flood,
}

impl IrrigationType {
    /// Water-use adjustment for this irrigation method.
    pub fn water_multiplier(self) -> f64 {
        match self {
            Self::Drip => 0.8,
            Self::Sprinkler => 1.0,
            Self::Flood => 1.3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Drip => "drip",
            Self::Sprinkler => "sprinkler",
            Self::Flood => "flood",
        }
    }
}

/// Errors that can occur during resource calculations.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("Resource data not available for {0}")]
    UnknownCrop(String),

    #[error("Plot size must be positive, got {0}")]
    InvalidPlotSize(f64),

    #[error("Advisor error: {0}")]
    Advisor(#[from] AdvisorError),
}

/// Result type for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// A calculated amount with its cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLine {
    pub amount: f64,
    pub unit: String,
    pub cost: f64,
}

/// N-P-K fertilizer lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilizerLines {
    pub nitrogen: ResourceLine,
    pub phosphorus: ResourceLine,
    pub potassium: ResourceLine,
}

impl FertilizerLines {
    pub fn total_cost(&self) -> f64 {
        round2(self.nitrogen.cost + self.phosphorus.cost + self.potassium.cost)
    }
}

/// Full resource estimate for one crop on one plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceEstimate {
    pub crop: String,
    pub plot_size_ha: f64,
    pub soil_type: SoilType,
    pub irrigation_type: IrrigationType,
    pub seeds: ResourceLine,
    pub fertilizer: FertilizerLines,
    pub water: ResourceLine,
    pub labor: ResourceLine,
    pub total_cost: f64,
}

/// Whether a stated budget covers the estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Sufficient,
    Insufficient,
    Unknown,
}

/// A resource estimate with AI recommendations attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcePlan {
    pub estimate: ResourceEstimate,
    pub recommendations: String,
    pub budget_status: BudgetStatus,
}

fn requirements_for(crop: &str) -> Option<&'static CropRequirements> {
    let needle = crop.trim().to_lowercase();
    CROP_REQUIREMENTS.iter().find(|r| r.crop == needle)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Calculate resource requirements for a crop and plot.
pub fn calculate(
    crop: &str,
    plot_size_ha: f64,
    soil_type: SoilType,
    irrigation_type: IrrigationType,
) -> ResourceResult<ResourceEstimate> {
    if !plot_size_ha.is_finite() || plot_size_ha <= 0.0 {
        return Err(ResourceError::InvalidPlotSize(plot_size_ha));
    }
    let req =
        requirements_for(crop).ok_or_else(|| ResourceError::UnknownCrop(crop.to_string()))?;

    let seed_amount = req.seeds_kg_per_ha * plot_size_ha;
    let seeds = ResourceLine {
        amount: round2(seed_amount),
        unit: "kg".to_string(),
        cost: round2(seed_amount * req.seed_cost_per_kg),
    };

    let soil = soil_type.fertilizer_multiplier();
    let fertilizer_line = |kg_per_ha: f64, cost_per_kg: f64| {
        let amount = kg_per_ha * plot_size_ha * soil;
        ResourceLine {
            amount: round2(amount),
            unit: "kg".to_string(),
            cost: round2(amount * cost_per_kg),
        }
    };
    let fertilizer = FertilizerLines {
        nitrogen: fertilizer_line(req.nitrogen_kg_per_ha, NITROGEN_COST_PER_KG),
        phosphorus: fertilizer_line(req.phosphorus_kg_per_ha, PHOSPHORUS_COST_PER_KG),
        potassium: fertilizer_line(req.potassium_kg_per_ha, POTASSIUM_COST_PER_KG),
    };

    let water_amount = req.water_mm_per_season * plot_size_ha * irrigation_type.water_multiplier();
    let water = ResourceLine {
        amount: round2(water_amount),
        unit: "mm total".to_string(),
        cost: round2(water_amount * WATER_COST_PER_MM),
    };

    let labor_amount = req.labor_hours_per_ha * plot_size_ha;
    let labor = ResourceLine {
        amount: round2(labor_amount),
        unit: "hours".to_string(),
        cost: round2(labor_amount * LABOR_COST_PER_HOUR),
    };

    let total_cost = round2(seeds.cost + fertilizer.total_cost() + water.cost + labor.cost);

    Ok(ResourceEstimate {
        crop: req.crop.to_string(),
        plot_size_ha,
        soil_type,
        irrigation_type,
        seeds,
        fertilizer,
        water,
        labor,
        total_cost,
    })
}

/// Resource planning with AI recommendations.
#[derive(Clone)]
pub struct ResourceService {
    advisor: Arc<AdvisorClient>,
}

impl ResourceService {
    pub fn new(advisor: Arc<AdvisorClient>) -> Self {
        Self { advisor }
    }

    /// Resource estimate plus AI optimization recommendations.
    #[instrument(skip(self), level = "info")]
    pub async fn recommendations(
        &self,
        crop: &str,
        plot_size_ha: f64,
        soil_type: SoilType,
        irrigation_type: IrrigationType,
        location: &str,
        budget: Option<f64>,
    ) -> ResourceResult<ResourcePlan> {
        let estimate = calculate(crop, plot_size_ha, soil_type, irrigation_type)?;

        let budget_status = match budget {
            Some(b) if b >= estimate.total_cost => BudgetStatus::Sufficient,
            Some(_) => BudgetStatus::Insufficient,
            None => BudgetStatus::Unknown,
        };

        let prompt = recommendations_prompt(&estimate, location, budget);
        let recommendations = self.advisor.generate(&prompt).await?;

        Ok(ResourcePlan {
            estimate,
            recommendations,
            budget_status,
        })
    }

    /// AI irrigation schedule for a crop and plot.
    pub async fn irrigation_schedule(
        &self,
        crop: &str,
        plot_size_ha: f64,
        location: &str,
        irrigation_type: IrrigationType,
    ) -> ResourceResult<String> {
        if !plot_size_ha.is_finite() || plot_size_ha <= 0.0 {
            return Err(ResourceError::InvalidPlotSize(plot_size_ha));
        }
        let req =
            requirements_for(crop).ok_or_else(|| ResourceError::UnknownCrop(crop.to_string()))?;

        let prompt = format!(
            "As an irrigation specialist, create an optimal irrigation schedule \
             for {}:\n\n\
             Farm Details:\n\
             - Crop: {}\n\
             - Plot size: {} hectares\n\
             - Location: {}\n\
             - Irrigation type: {}\n\
             - Total water needs: {} mm/season\n\n\
             Please provide:\n\
             1. Daily/weekly irrigation schedule\n\
             2. Water amounts per irrigation session\n\
             3. Critical irrigation periods\n\
             4. Water conservation strategies\n\
             5. Monitoring recommendations\n\
             6. Seasonal adjustments\n\
             7. Equipment requirements\n\n\
             Consider South African climate conditions and water scarcity.",
            req.crop,
            req.crop,
            plot_size_ha,
            location,
            irrigation_type.as_str(),
            req.water_mm_per_season,
        );

        Ok(self.advisor.generate(&prompt).await?)
    }

    /// AI fertilizer application program for a crop and plot.
    pub async fn fertilizer_program(
        &self,
        crop: &str,
        plot_size_ha: f64,
        soil_test_results: Option<&str>,
    ) -> ResourceResult<String> {
        if !plot_size_ha.is_finite() || plot_size_ha <= 0.0 {
            return Err(ResourceError::InvalidPlotSize(plot_size_ha));
        }
        let req =
            requirements_for(crop).ok_or_else(|| ResourceError::UnknownCrop(crop.to_string()))?;

        let mut prompt = format!(
            "As a soil fertility expert, create a detailed fertilizer program \
             for {}:\n\n\
             Farm Details:\n\
             - Crop: {}\n\
             - Plot size: {} hectares\n\
             - Nitrogen needs: {} kg/ha\n\
             - Phosphorus needs: {} kg/ha\n\
             - Potassium needs: {} kg/ha\n",
            req.crop,
            req.crop,
            plot_size_ha,
            req.nitrogen_kg_per_ha,
            req.phosphorus_kg_per_ha,
            req.potassium_kg_per_ha,
        );

        if let Some(results) = soil_test_results {
            prompt.push_str(&format!("\nSoil test results: {}\n", results));
        }

        prompt.push_str(
            "\nPlease provide:\n\
             1. Pre-planting fertilizer application\n\
             2. Side-dressing schedule and amounts\n\
             3. Foliar feeding recommendations\n\
             4. Organic vs synthetic options\n\
             5. Application timing and methods\n\
             6. Soil pH management\n\
             7. Micronutrient recommendations\n\
             8. Cost optimization strategies\n\n\
             Focus on South African farming conditions and available fertilizers.",
        );

        Ok(self.advisor.generate(&prompt).await?)
    }
}

fn recommendations_prompt(
    estimate: &ResourceEstimate,
    location: &str,
    budget: Option<f64>,
) -> String {
    let mut prompt = format!(
        "As an agricultural resource specialist, provide detailed \
         recommendations for {} farming:\n\n\
         Farm Details:\n\
         - Crop: {}\n\
         - Plot size: {} hectares\n\
         - Soil type: {}\n\
         - Location: {}\n",
        estimate.crop,
        estimate.crop,
        estimate.plot_size_ha,
        estimate.soil_type.as_str(),
        location,
    );

    if let Some(budget) = budget {
        prompt.push_str(&format!("- Budget: R{}\n", budget));
    }

    prompt.push_str(&format!(
        "\nCalculated Resource Requirements:\n\
         - Seeds: {} {} (R{})\n\
         - Fertilizer total cost: R{}\n\
         - Water: {} {} (R{})\n\
         - Labor: {} {} (R{})\n\
         - Total estimated cost: R{}\n\n\
         Please provide:\n\
         1. Resource optimization strategies\n\
         2. Cost-saving recommendations\n\
         3. Quality vs cost trade-offs\n\
         4. Timing recommendations for purchases\n\
         5. Alternative resource options\n\
         6. Risk mitigation strategies\n\
         7. Expected ROI analysis\n",
        estimate.seeds.amount,
        estimate.seeds.unit,
        estimate.seeds.cost,
        estimate.fertilizer.total_cost(),
        estimate.water.amount,
        estimate.water.unit,
        estimate.water.cost,
        estimate.labor.amount,
        estimate.labor.unit,
        estimate.labor.cost,
        estimate.total_cost,
    ));

    if let Some(budget) = budget {
        if budget < estimate.total_cost {
            prompt.push_str(&format!(
                "\nIMPORTANT: The budget (R{}) is below estimated costs (R{}). \
                 Provide budget-friendly alternatives.",
                budget, estimate.total_cost
            ));
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_calculate_maize_medium_soil_drip() {
        let estimate =
            calculate("maize", 10.0, SoilType::Medium, IrrigationType::Drip).unwrap();

        // Seeds: 25 kg/ha * 10 ha = 250 kg at R45 = R11250
        assert_eq!(estimate.seeds.amount, 250.0);
        assert_eq!(estimate.seeds.cost, 11250.0);

        // Nitrogen: 120 * 10 * 1.0 = 1200 kg at R12 = R14400
        assert_eq!(estimate.fertilizer.nitrogen.amount, 1200.0);
        assert_eq!(estimate.fertilizer.nitrogen.cost, 14400.0);

        // Water: 600 * 10 * 0.8 (drip) = 4800 mm at R2.5 = R12000
        assert_eq!(estimate.water.amount, 4800.0);
        assert_eq!(estimate.water.cost, 12000.0);

        // Labor: 40 * 10 = 400 hours at R25 = R10000
        assert_eq!(estimate.labor.amount, 400.0);
        assert_eq!(estimate.labor.cost, 10000.0);

        // Fertilizer: N 14400 + P (600*15=9000) + K (400*18=7200) = 30600
        assert_eq!(estimate.fertilizer.total_cost(), 30600.0);
        assert_eq!(estimate.total_cost, 11250.0 + 30600.0 + 12000.0 + 10000.0);
    }

    #[test]
    fn test_poor_soil_raises_fertilizer_only() {
        let medium = calculate("wheat", 5.0, SoilType::Medium, IrrigationType::Sprinkler).unwrap();
        let poor = calculate("wheat", 5.0, SoilType::Poor, IrrigationType::Sprinkler).unwrap();

        assert!(poor.fertilizer.total_cost() > medium.fertilizer.total_cost());
        assert_eq!(poor.seeds, medium.seeds);
        assert_eq!(poor.water, medium.water);
        assert_eq!(poor.labor, medium.labor);
    }

    #[test]
    fn test_rich_soil_lowers_fertilizer() {
        let medium = calculate("maize", 1.0, SoilType::Medium, IrrigationType::Drip).unwrap();
        let rich = calculate("maize", 1.0, SoilType::Rich, IrrigationType::Drip).unwrap();

        assert_eq!(medium.fertilizer.nitrogen.amount, 120.0);
        assert_eq!(rich.fertilizer.nitrogen.amount, 96.0);
    }

    #[test]
    fn test_flood_irrigation_uses_more_water() {
        let drip = calculate("potatoes", 2.0, SoilType::Medium, IrrigationType::Drip).unwrap();
        let flood = calculate("potatoes", 2.0, SoilType::Medium, IrrigationType::Flood).unwrap();

        // 1400mm base: 0.8 vs 1.3 multiplier
        assert_eq!(drip.water.amount, 1120.0);
        assert_eq!(flood.water.amount, 1820.0);
    }

    #[test]
    fn test_unknown_crop() {
        let err = calculate("quinoa", 1.0, SoilType::Medium, IrrigationType::Drip).unwrap_err();
        assert!(matches!(err, ResourceError::UnknownCrop(_)));
    }

    #[test]
    fn test_invalid_plot_size() {
        for bad in [0.0, -3.0, f64::NAN] {
            let err = calculate("maize", bad, SoilType::Medium, IrrigationType::Drip).unwrap_err();
            assert!(matches!(err, ResourceError::InvalidPlotSize(_)));
        }
    }

    #[test]
    fn test_crop_name_is_normalized() {
        let estimate =
            calculate(" Tomatoes ", 1.0, SoilType::Medium, IrrigationType::Drip).unwrap();
        assert_eq!(estimate.crop, "tomatoes");
        // Fractional seed amounts survive rounding: 0.3 kg/ha
        assert_eq!(estimate.seeds.amount, 0.3);
        assert_eq!(estimate.seeds.cost, 750.0);
    }

    #[test]
    fn test_recommendations_prompt_flags_insufficient_budget() {
        let estimate = calculate("maize", 10.0, SoilType::Medium, IrrigationType::Drip).unwrap();
        let prompt = recommendations_prompt(&estimate, "Bloemfontein", Some(1000.0));
        assert!(prompt.contains("IMPORTANT"));
        assert!(prompt.contains("Bloemfontein"));

        let prompt = recommendations_prompt(&estimate, "Bloemfontein", Some(1_000_000.0));
        assert!(!prompt.contains("IMPORTANT"));
    }
}
