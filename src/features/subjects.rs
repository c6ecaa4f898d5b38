use super::{require, FeatureError};
use crate::live::{Keyed, LiveCollection};
use crate::model::{ClassLevel, Subject};

pub fn save(
    live: &LiveCollection<Subject>,
    id: Option<&str>,
    form: &Subject,
) -> Result<String, FeatureError> {
    require(&form.name, "name")?;
    match id {
        Some(id) => {
            live.update(id, form)?;
            Ok(id.to_string())
        }
        None => Ok(live.create(form)?),
    }
}

pub fn available_for(subjects: &[Keyed<Subject>], level: ClassLevel) -> Vec<&Keyed<Subject>> {
    subjects
        .iter()
        .filter(|s| s.record.level.offered_for(level))
        .collect()
}

pub fn name_of<'a>(subjects: &'a [Keyed<Subject>], id: &str) -> Option<&'a str> {
    subjects
        .iter()
        .find(|s| s.id == id)
        .map(|s| s.record.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SubjectLevel;

    fn subject(id: &str, level: SubjectLevel) -> Keyed<Subject> {
        Keyed {
            id: id.to_string(),
            record: Subject {
                name: id.to_uppercase(),
                level,
            },
        }
    }

    #[test]
    fn secondary_classes_skip_primary_only_subjects() {
        let all = vec![
            subject("math", SubjectLevel::Both),
            subject("play", SubjectLevel::Primary),
            subject("chem", SubjectLevel::Secondary),
        ];
        let ids: Vec<&str> = available_for(&all, ClassLevel::Secondary)
            .iter()
            .map(|s| s.id.as_str())
            .collect();
        assert_eq!(ids, vec!["math", "chem"]);
        assert_eq!(name_of(&all, "play"), Some("PLAY"));
        assert_eq!(name_of(&all, "gone"), None);
    }
}
