//! Configuration validation
//!
//! Rules:
//! - app_name is not blank
//! - backend names are unique and not blank
//! - queue_capacity > 0
//! - backend-specific required params are present

use std::collections::HashSet;

use contracts::{ContractError, RouterBlueprint};

/// Validate a RouterBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &RouterBlueprint) -> Result<(), ContractError> {
    validate_app_name(blueprint)?;
    validate_backend_names(blueprint)?;
    validate_backend_params(blueprint)?;
    Ok(())
}

fn validate_app_name(blueprint: &RouterBlueprint) -> Result<(), ContractError> {
    if blueprint.app_name.trim().is_empty() {
        return Err(ContractError::config_validation(
            "app_name",
            "app_name cannot be empty",
        ));
    }
    Ok(())
}

/// Backend names identify registrations, so they must be unique
fn validate_backend_names(blueprint: &RouterBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, backend) in blueprint.backends.iter().enumerate() {
        if backend.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("backends[{}].name", idx),
                "backend name cannot be empty",
            ));
        }
        if !seen.insert(backend.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("backends[name={}]", backend.name),
                "duplicate backend name",
            ));
        }
    }
    Ok(())
}

fn validate_backend_params(blueprint: &RouterBlueprint) -> Result<(), ContractError> {
    for backend in &blueprint.backends {
        if backend.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("backends[{}].queue_capacity", backend.name),
                "queue_capacity must be > 0",
            ));
        }
        for param in backend.backend_type.required_params() {
            let present = backend
                .params
                .get(*param)
                .is_some_and(|value| !value.trim().is_empty());
            if !present {
                return Err(ContractError::config_validation(
                    format!("backends[{}].params.{}", backend.name, param),
                    format!("{:?} backend requires '{}'", backend.backend_type, param),
                ));
            }
        }
    }
    Ok(())
}
