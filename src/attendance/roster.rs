use super::model::{normalize_roll_number, Student, StudentStatus};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Class keys in registration order.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    positions: HashMap<String, usize>,
}

impl ClassRegistry {
    pub fn new<I, S>(class_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut positions = HashMap::new();
        for (i, id) in class_ids.into_iter().enumerate() {
            positions.entry(id.into()).or_insert(i);
        }
        Self { positions }
    }

    /// Unregistered classes sort after every registered one.
    pub fn position(&self, class_id: &str) -> usize {
        self.positions.get(class_id).copied().unwrap_or(usize::MAX)
    }
}

/// The inactivation date itself is the first day a student is not eligible.
pub fn is_eligible_on(student: &Student, date: NaiveDate) -> bool {
    match student.status {
        StudentStatus::Active => true,
        StudentStatus::Inactive => student
            .inactivation_date
            .map(|cutoff| date < cutoff)
            .unwrap_or(false),
    }
}

pub fn eligible_on<'a>(
    date: NaiveDate,
    roster: &'a [Student],
    classes: &ClassRegistry,
) -> Vec<&'a Student> {
    let mut out: Vec<&Student> = roster.iter().filter(|s| is_eligible_on(s, date)).collect();
    sort_for_register(&mut out, classes);
    out
}

pub fn sort_for_register(students: &mut [&Student], classes: &ClassRegistry) {
    students.sort_by(|a, b| {
        classes
            .position(&a.class)
            .cmp(&classes.position(&b.class))
            .then_with(|| {
                normalize_roll_number(&a.roll_number).cmp(&normalize_roll_number(&b.roll_number))
            })
            .then_with(|| a.id.cmp(&b.id))
    });
}
