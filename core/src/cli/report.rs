use crate::types::catalog::{LUNG_LOBES, ORGANS};
use crate::types::MetricsResult;
use serde_json::Value;
use std::fmt;

const WIDTH: usize = 34;

/// Text report formatter for a case's metrics
///
/// Sections without any computed key are left out; explicit `null` values
/// print as `n/a`.
pub struct TextReport<'a> {
    result: &'a MetricsResult,
}

impl<'a> TextReport<'a> {
    /// Creates a new text report
    pub fn new(result: &'a MetricsResult) -> Self {
        Self { result }
    }

    fn has_any(&self, keys: &[String]) -> bool {
        keys.iter().any(|k| self.result.contains_key(k))
    }

    fn section(&self, f: &mut fmt::Formatter<'_>, title: &str, keys: &[String]) -> fmt::Result {
        if !self.has_any(keys) {
            return Ok(());
        }
        writeln!(f)?;
        writeln!(f, "{}", title)?;
        writeln!(f, "{}", "-".repeat(title.len()))?;
        for key in keys {
            if let Some(value) = self.result.get(key) {
                writeln!(f, "{:<width$}{}", format!("{}:", key), render(value), width = WIDTH)?;
            }
        }
        Ok(())
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => "n/a".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(render).collect::<Vec<_>>().join(", "),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}={}", k, render(v)))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl<'a> fmt::Display for TextReport<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Case Metrics")?;
        writeln!(f, "============")?;
        writeln!(
            f,
            "Case:           {}",
            self.result.get_str("case_id").unwrap_or("unknown")
        )?;
        writeln!(
            f,
            "Modality:       {}",
            self.result.get_str("modality").unwrap_or("unknown")
        )?;
        let regions = self
            .result
            .get("body_regions")
            .map(render)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "none".to_string());
        writeln!(f, "Body Regions:   {}", regions)?;

        let organs: Vec<String> = ORGANS
            .iter()
            .flat_map(|o| {
                ["vol_cm3", "hu_mean", "hu_std", "pdff_percent", "pdff_kvp"]
                    .iter()
                    .map(move |m| format!("{}_{}", o, m))
            })
            .collect();
        self.section(f, "Organs", &organs)?;

        self.section(
            f,
            "Body Composition (L3)",
            &keys(&["slice_L3", "SMA_cm2", "muscle_HU_mean", "muscle_HU_std"]),
        )?;
        self.section(
            f,
            "Hemorrhage",
            &keys(&["hemorrhage_vol_cm3", "hemorrhage_analysis_slices"]),
        )?;
        self.section(
            f,
            "Bone Density (L1)",
            &keys(&[
                "L1_trabecular_HU_mean",
                "L1_trabecular_HU_std",
                "L1_trabecular_voxel_count",
                "L1_bmd_classification",
            ]),
        )?;

        let mut lungs: Vec<String> = LUNG_LOBES
            .iter()
            .flat_map(|l| {
                ["emphysema_percent", "vol_cm3", "emphysema_vol_cm3"]
                    .iter()
                    .map(move |m| format!("{}_{}", l.name, m))
            })
            .collect();
        lungs.extend(keys(&[
            "total_lung_emphysema_percent",
            "total_lung_vol_cm3",
            "total_lung_emphysema_vol_cm3",
            "lung_analysis_status",
        ]));
        self.section(f, "Lungs", &lungs)?;

        Ok(())
    }
}
