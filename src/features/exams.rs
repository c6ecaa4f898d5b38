use super::{parse_date, require, FeatureError, ValidationError};
use crate::live::LiveCollection;
use crate::model::Exam;

pub fn validate(exam: &Exam) -> Result<(), ValidationError> {
    require(&exam.name, "name")?;
    parse_date(&exam.date, "date")?;
    if exam.class_ids.iter().all(|c| c.trim().is_empty()) {
        return Err(ValidationError::Required("classIds"));
    }
    if exam.max_marks == 0 {
        return Err(ValidationError::Invalid {
            field: "maxMarks",
            reason: "must be greater than 0".to_string(),
        });
    }
    if exam.pass_marks > exam.max_marks {
        return Err(ValidationError::Invalid {
            field: "passMarks",
            reason: format!("must not exceed maxMarks ({})", exam.max_marks),
        });
    }
    Ok(())
}

pub fn save(live: &LiveCollection<Exam>, id: Option<&str>, form: &Exam) -> Result<String, FeatureError> {
    validate(form)?;
    match id {
        Some(id) => {
            live.update(id, form)?;
            Ok(id.to_string())
        }
        None => Ok(live.create(form)?),
    }
}
