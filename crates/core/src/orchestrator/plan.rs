//! Batch validation and expansion into tasks.

use std::collections::HashSet;

use crate::feed::{is_safe_stage_id, DataKind, RallyClass};

use super::types::{FetchRequest, FetchTask, ValidationError};

/// Validate a whole batch and expand it into tasks.
///
/// Every violation in the batch is collected, each prefixed with the index
/// of its request. A stage-scoped request expands to one task per stage id
/// and any other request to exactly one task. Stage ids must be plain names
/// (see [`is_safe_stage_id`]) and no two tasks may share a resource key,
/// since both end up in file and sheet names.
pub fn plan_batch(requests: &[FetchRequest]) -> Result<Vec<FetchTask>, ValidationError> {
    if requests.is_empty() {
        return Err(ValidationError {
            errors: vec!["batch contains no requests".to_string()],
        });
    }

    let mut errors = Vec::new();
    let mut tasks = Vec::new();
    let mut seen = HashSet::new();

    for (index, request) in requests.iter().enumerate() {
        let mut reject = |message: String| errors.push(format!("request {}: {}", index, message));

        let class = request
            .class_id
            .parse::<RallyClass>()
            .map_err(|e| reject(e.to_string()))
            .ok();
        let kind = request
            .kind
            .parse::<DataKind>()
            .map_err(|e| reject(e.to_string()))
            .ok();
        let stage_ids = request.stage_ids.as_deref().unwrap_or_default();

        let Some(kind) = kind else {
            continue;
        };

        let mut stages = Vec::new();
        if kind.is_stage_scoped() {
            if stage_ids.is_empty() {
                reject(format!("{} requires at least one stage id", kind));
            }
            for (position, stage) in stage_ids.iter().enumerate() {
                let stage = stage.trim();
                if stage.is_empty() {
                    reject(format!("stage id at position {} is blank", position));
                } else if !is_safe_stage_id(stage) {
                    reject(format!(
                        "stage id '{}' may only contain ASCII letters, digits, '-', '_' and '.'",
                        stage
                    ));
                } else {
                    stages.push(Some(stage.to_string()));
                }
            }
        } else if !stage_ids.is_empty() {
            reject(format!("{} does not take stage ids", kind));
        } else {
            stages.push(None);
        }

        let Some(class) = class else {
            continue;
        };

        for stage_id in stages {
            let task = FetchTask {
                kind,
                class,
                stage_id,
            };
            if seen.insert(task.key()) {
                tasks.push(task);
            } else {
                reject(format!("duplicate task {}", task.key()));
            }
        }
    }

    if errors.is_empty() {
        Ok(tasks)
    } else {
        Err(ValidationError { errors })
    }
}

/// Requests for `kinds` on the active stage of each class.
pub fn follow_up_requests(
    active_stages: &[(RallyClass, String)],
    kinds: &[DataKind],
) -> Vec<FetchRequest> {
    active_stages
        .iter()
        .flat_map(|(class, stage)| {
            kinds
                .iter()
                .map(move |kind| FetchRequest::new(*class, *kind, Some(vec![stage.clone()])))
        })
        .collect()
}
