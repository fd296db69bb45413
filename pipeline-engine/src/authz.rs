use crate::data::pipeline_run::{PipelineRun, StageSlot};
use crate::error::{Error, Result};
use crate::principal::Principal;

/// Resolve the [`StageSlot`] a `workflow_operation` code authorizes against. The four recognized
/// codes map 1:1 onto the four user slots on [`PipelineRun`].
pub fn slot_for_operation(workflow_operation: &str) -> Option<StageSlot> {
    match workflow_operation {
        "collection" => Some(StageSlot::Collection),
        "load" => Some(StageSlot::Load),
        "check" => Some(StageSlot::Check),
        "qa" => Some(StageSlot::Qa),
        _ => None,
    }
}

/// Shared by the task execution engine and source-table management: confirm `principal` owns
/// `run`'s current stage slot, or is an admin.
pub fn check_user_run(run: &PipelineRun, principal: &Principal) -> Result<()> {
    if principal.is_admin() {
        return Ok(());
    }
    let Some(slot) = slot_for_operation(&run.workflow_operation) else {
        return Err(Error::BadRequest(format!(
            "Unknown workflow operation '{}'",
            run.workflow_operation
        )));
    };
    match run.slot_user(slot) {
        Some(owner) if owner == principal.username => Ok(()),
        _ => Err(Error::Unauthorized(format!(
            "{} does not own run {} at its current stage",
            principal.username, run.run_id
        ))),
    }
}

#[cfg(test)]
mod test {
    use super::{check_user_run, slot_for_operation};
    use crate::data::pipeline_run::{OperationState, PipelineRun, PipelineRunId, StageSlot};
    use crate::data::user::UserId;
    use crate::principal::Principal;
    use chrono::NaiveDate;

    fn run(workflow_operation: &str, collection_user: Option<&str>) -> PipelineRun {
        PipelineRun {
            run_id: PipelineRunId(1),
            data_source_id: 1,
            record_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
            workflow_operation: workflow_operation.to_owned(),
            operation_state: OperationState::Active,
            collection_user: collection_user.map(ToOwned::to_owned),
            load_user: None,
            check_user: None,
            qa_user: None,
        }
    }

    fn principal(username: &str, admin: bool) -> Principal {
        Principal {
            user_id: UserId(1),
            username: username.to_owned(),
            roles: if admin { vec!["admin".to_owned()] } else { vec![] },
        }
    }

    #[test]
    fn slot_for_operation_maps_the_four_workflow_codes() {
        assert_eq!(slot_for_operation("collection"), Some(StageSlot::Collection));
        assert_eq!(slot_for_operation("load"), Some(StageSlot::Load));
        assert_eq!(slot_for_operation("check"), Some(StageSlot::Check));
        assert_eq!(slot_for_operation("qa"), Some(StageSlot::Qa));
        assert_eq!(slot_for_operation("unknown"), None);
    }

    #[test]
    fn admin_bypasses_slot_ownership() {
        let run = run("collection", Some("alice"));
        assert!(check_user_run(&run, &principal("bob", true)).is_ok());
    }

    #[test]
    fn slot_owner_is_authorized() {
        let run = run("collection", Some("alice"));
        assert!(check_user_run(&run, &principal("alice", false)).is_ok());
    }

    #[test]
    fn non_owner_is_rejected() {
        let run = run("collection", Some("alice"));
        assert!(check_user_run(&run, &principal("bob", false)).is_err());
    }

    #[test]
    fn empty_slot_rejects_everyone_but_admin() {
        let run = run("collection", None);
        assert!(check_user_run(&run, &principal("alice", false)).is_err());
    }
}
