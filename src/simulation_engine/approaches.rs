use crate::control_system::signal_controller::SignalController;

/// One or more incoming lanes sharing the same right-of-way assignment.
/// The group only carries its controller slot index; everything it needs to
/// know about signal state it asks the controller.
#[derive(Debug, Clone)]
pub struct ApproachGroup {
    /// Index into the controller's per-phase green vectors.
    pub index: usize,
    pub name: String,
}

impl ApproachGroup {
    pub fn new(index: usize, name: &str) -> Self {
        Self {
            index,
            name: name.to_string(),
        }
    }

    /// Whether this group currently has right-of-way.
    pub fn is_green(&self, controller: &SignalController) -> bool {
        controller.is_group_green(self.index)
    }
}

/// The standard four-arm intersection geometry.
pub fn create_approach_groups() -> Vec<ApproachGroup> {
    vec![
        ApproachGroup::new(0, "North"),
        ApproachGroup::new(1, "East"),
        ApproachGroup::new(2, "South"),
        ApproachGroup::new(3, "West"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control_system::config::SignalConfig;
    use crate::detection::count_source::CountBoard;
    use std::sync::Arc;

    #[test]
    fn groups_follow_the_active_phase() {
        let groups = create_approach_groups();
        let board = Arc::new(CountBoard::new(groups.len()));
        let controller = SignalController::new(SignalConfig::default(), board).unwrap();
        // Phase 0 is green for the north-south pair.
        assert!(groups[0].is_green(&controller));
        assert!(!groups[1].is_green(&controller));
        assert!(groups[2].is_green(&controller));
        assert!(!groups[3].is_green(&controller));
    }
}
