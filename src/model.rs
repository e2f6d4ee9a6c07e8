use chrono::NaiveDate;
use serde::Serialize;

/// Grade categories as stored in `grades.type`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradeKind {
    OralHw,
    WrittenHw,
    Dictation,
    Classwork,
    /// Marks homework assigned for the next lesson; never averaged.
    HomeworkNext,
    /// Anything else the CRUD layer stores (`teacher_comment`, ...). Kept verbatim.
    Other(String),
}

impl GradeKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "oral_hw" => GradeKind::OralHw,
            "written_hw" => GradeKind::WrittenHw,
            "dictation" => GradeKind::Dictation,
            "classwork" => GradeKind::Classwork,
            "homework_next" => GradeKind::HomeworkNext,
            other => GradeKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GradeKind::OralHw => "oral_hw",
            GradeKind::WrittenHw => "written_hw",
            GradeKind::Dictation => "dictation",
            GradeKind::Classwork => "classwork",
            GradeKind::HomeworkNext => "homework_next",
            GradeKind::Other(s) => s.as_str(),
        }
    }

    /// The four kinds that count toward a numeric average.
    pub fn is_lesson_grade(&self) -> bool {
        matches!(
            self,
            GradeKind::OralHw | GradeKind::WrittenHw | GradeKind::Dictation | GradeKind::Classwork
        )
    }

    /// Kinds that prove an earlier `homework_next` assignment was done.
    pub fn is_homework_check(&self) -> bool {
        matches!(self, GradeKind::OralHw | GradeKind::WrittenHw)
    }
}

#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub id: i64,
    pub full_name: String,
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct GroupRecord {
    pub id: i64,
    pub name: String,
    pub teacher_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct AttendanceRecord {
    pub id: i64,
    pub student_id: i64,
    pub group_id: i64,
    pub lesson_date: NaiveDate,
    pub present: bool,
    pub program_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct GradeRecord {
    pub id: i64,
    pub student_id: i64,
    pub group_id: i64,
    pub lesson_date: Option<NaiveDate>,
    pub value: i64,
    pub kind: GradeKind,
    pub comment: Option<String>,
    pub program_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct HomeworkRecord {
    pub id: i64,
    pub program_id: i64,
}

#[derive(Debug, Clone)]
pub struct HomeworkSubmissionRecord {
    pub homework_id: i64,
    pub student_id: i64,
}

#[derive(Debug, Clone)]
pub struct TestRecord {
    pub id: i64,
    pub program_id: i64,
}

#[derive(Debug, Clone)]
pub struct TestSubmissionRecord {
    pub id: i64,
    pub test_id: i64,
    pub student_id: i64,
    pub score: Option<i64>,
    pub max_score: Option<i64>,
    pub is_approved_for_retake: bool,
}

/// Weekly intention or daily question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentItem {
    pub id: i64,
    pub text: String,
    pub order: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_kind_round_trips_known_and_unknown_strings() {
        for raw in ["oral_hw", "written_hw", "dictation", "classwork", "homework_next"] {
            assert_eq!(GradeKind::parse(raw).as_str(), raw);
        }
        let other = GradeKind::parse("teacher_comment");
        assert_eq!(other, GradeKind::Other("teacher_comment".into()));
        assert!(!other.is_lesson_grade());
    }

    #[test]
    fn homework_next_is_not_a_lesson_grade() {
        assert!(!GradeKind::HomeworkNext.is_lesson_grade());
        assert!(GradeKind::Dictation.is_lesson_grade());
        assert!(!GradeKind::Dictation.is_homework_check());
        assert!(GradeKind::WrittenHw.is_homework_check());
    }
}
