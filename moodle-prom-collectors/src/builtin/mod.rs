//! Built-in collectors, one per Moodle data domain.

pub mod activity;
pub mod courses;
pub mod enrolments;
pub mod modules;
pub mod tasks;
pub mod users;

use crate::registry::CollectorRegistry;
use std::sync::Arc;

/// Register all built-in collectors in output-merge order.
pub fn register_all(registry: &mut CollectorRegistry) {
    registry.register(Arc::new(users::UsersCollector));
    registry.register(Arc::new(courses::CoursesCollector));
    registry.register(Arc::new(enrolments::EnrolmentsCollector));
    registry.register(Arc::new(modules::ModulesCollector));
    registry.register(Arc::new(tasks::TasksCollector));
    registry.register(Arc::new(activity::ActivityCollector));

    tracing::info!(count = registry.len(), "Registered all built-in collectors");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_every_builtin_in_order() {
        let mut reg = CollectorRegistry::new();
        register_all(&mut reg);
        assert_eq!(
            reg.list(),
            vec!["users", "courses", "enrolments", "modules", "tasks", "activity"]
        );
    }

    #[test]
    fn register_all_twice_does_not_duplicate() {
        let mut reg = CollectorRegistry::new();
        register_all(&mut reg);
        register_all(&mut reg);
        assert_eq!(reg.len(), 6);
    }
}
