use super::{require, FeatureError};
use crate::live::{Keyed, LiveCollection};
use crate::model::{Role, UserProfile};
use crate::store::timestamp;

pub fn teachers(users: &[Keyed<UserProfile>]) -> Vec<Keyed<UserProfile>> {
    users
        .iter()
        .filter(|u| u.record.role == Role::Teacher)
        .cloned()
        .collect()
}

fn validate(form: &UserProfile) -> Result<(), FeatureError> {
    require(&form.display_name, "displayName")?;
    require(&form.email, "email")?;
    Ok(())
}

/// Adds a teacher profile. No login is created; see `settings::create_user`.
pub fn create(live: &LiveCollection<UserProfile>, form: &UserProfile) -> Result<String, FeatureError> {
    validate(form)?;
    let profile = UserProfile {
        role: Role::Teacher,
        join_date: form.join_date.clone().or_else(|| Some(timestamp())),
        ..form.clone()
    };
    Ok(live.create(&profile)?)
}

pub fn update(
    live: &LiveCollection<UserProfile>,
    id: &str,
    form: &UserProfile,
) -> Result<(), FeatureError> {
    validate(form)?;
    Ok(live.update(id, form)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_teachers_are_listed() {
        let users = vec![
            Keyed {
                id: "a".to_string(),
                record: UserProfile {
                    role: Role::Admin,
                    ..UserProfile::default()
                },
            },
            Keyed {
                id: "t".to_string(),
                record: UserProfile::default(),
            },
        ];
        let list = teachers(&users);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "t");
    }
}
