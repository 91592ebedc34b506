//! Plant profile lookup, loading and saving.

use std::path::Path;

use pp_sim::{HeatingModel, PlantProfile};

use crate::error::{AppError, AppResult};

/// Summary of a profile for listing.
#[derive(Debug, Clone)]
pub struct ProfileSummary {
    pub name: String,
    pub description: String,
    pub heating: &'static str,
    pub water_steps: u16,
    pub fuel_steps: u16,
}

impl ProfileSummary {
    pub fn of(profile: &PlantProfile) -> Self {
        Self {
            name: profile.name.clone(),
            description: profile.description.clone(),
            heating: match profile.heating {
                HeatingModel::FixedStep { .. } => "fixed_step",
                HeatingModel::Calorimetric { .. } => "calorimetric",
            },
            water_steps: profile.water_steps(),
            fuel_steps: profile.fuel_steps(),
        }
    }
}

/// Summaries of every built-in profile.
pub fn list_profiles() -> Vec<ProfileSummary> {
    PlantProfile::BUILTIN
        .iter()
        .filter_map(|name| PlantProfile::builtin(name))
        .map(|p| ProfileSummary::of(&p))
        .collect()
}

pub fn builtin_profile(name: &str) -> AppResult<PlantProfile> {
    PlantProfile::builtin(name).ok_or_else(|| AppError::ProfileNotFound(name.to_string()))
}

/// Load and validate a profile from a YAML file.
pub fn load_profile(path: &Path) -> AppResult<PlantProfile> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ProfileFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let profile: PlantProfile = serde_yaml::from_str(&content)
        .map_err(|e| AppError::Profile(format!("Failed to parse profile YAML: {}", e)))?;
    profile.validate()?;

    Ok(profile)
}

/// Save a profile to a YAML file.
pub fn save_profile(path: &Path, profile: &PlantProfile) -> AppResult<()> {
    let content = profile_yaml(profile)?;

    std::fs::write(path, content).map_err(|e| AppError::ProfileFileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

pub fn profile_yaml(profile: &PlantProfile) -> AppResult<String> {
    serde_yaml::to_string(profile)
        .map_err(|e| AppError::Profile(format!("Failed to serialize profile: {}", e)))
}

/// Pick the profile to run: a file wins over a built-in name; neither means
/// `standard`.
pub fn resolve_profile(name: Option<&str>, file: Option<&Path>) -> AppResult<PlantProfile> {
    match (file, name) {
        (Some(path), _) => load_profile(path),
        (None, Some(name)) => builtin_profile(name),
        (None, None) => Ok(PlantProfile::standard()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_builtin() {
        let names: Vec<String> = list_profiles().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["standard", "classic"]);
    }

    #[test]
    fn summary_reports_heating_model() {
        let s = ProfileSummary::of(&PlantProfile::classic());
        assert_eq!(s.heating, "calorimetric");
        assert_eq!((s.water_steps, s.fuel_steps), (10, 4));
    }

    #[test]
    fn unknown_builtin() {
        assert!(matches!(
            builtin_profile("nuclear"),
            Err(AppError::ProfileNotFound(_))
        ));
    }

    #[test]
    fn resolve_defaults_to_standard() {
        assert_eq!(resolve_profile(None, None).unwrap().name, "standard");
        assert_eq!(resolve_profile(Some("classic"), None).unwrap().name, "classic");
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = load_profile(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, AppError::ProfileFileRead { .. }));
    }
}
