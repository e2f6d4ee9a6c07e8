use crate::model::{
    AttendanceRecord, GradeKind, GradeRecord, GroupRecord, HomeworkRecord, HomeworkSubmissionRecord,
    StudentRecord, TestRecord, TestSubmissionRecord,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Half-away-from-zero rounding to 2 decimals, used for every percentage and average.
pub fn round_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttendanceSummary {
    pub total: usize,
    pub attended: usize,
    /// 0.0 when `total == 0`, never NaN.
    pub rate: f64,
}

pub fn summarize_attendance<'a, I>(rows: I) -> AttendanceSummary
where
    I: IntoIterator<Item = &'a AttendanceRecord>,
{
    let mut total = 0usize;
    let mut attended = 0usize;
    for r in rows {
        total += 1;
        if r.present {
            attended += 1;
        }
    }
    let rate = if total > 0 {
        round_2_decimals(attended as f64 / total as f64 * 100.0)
    } else {
        0.0
    };
    AttendanceSummary {
        total,
        attended,
        rate,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradeAverage {
    /// Number of lesson-type grades that went into the average.
    pub count: usize,
    pub average: Option<f64>,
}

/// Averages lesson-type grades only; `homework_next` and unknown kinds are skipped.
pub fn lesson_grade_average<'a, I>(grades: I) -> GradeAverage
where
    I: IntoIterator<Item = &'a GradeRecord>,
{
    let mut count = 0usize;
    // i128 so that no pair of stored i64 values can overflow the sum.
    let mut sum = 0i128;
    for g in grades {
        if g.kind.is_lesson_grade() {
            count += 1;
            sum += i128::from(g.value);
        }
    }
    let average = if count > 0 {
        Some(round_2_decimals(sum as f64 / count as f64))
    } else {
        None
    };
    GradeAverage { count, average }
}

/// Per test, the submission with the highest score. A missing score ranks below every
/// real score, and the lower submission id wins ties.
pub fn best_submissions_by_test<'a, I>(submissions: I) -> BTreeMap<i64, &'a TestSubmissionRecord>
where
    I: IntoIterator<Item = &'a TestSubmissionRecord>,
{
    let mut best: BTreeMap<i64, &TestSubmissionRecord> = BTreeMap::new();
    for s in submissions {
        let keep_prev = best.get(&s.test_id).is_some_and(|prev| {
            // `None < Some(_)` for any score, negative ones included.
            prev.score > s.score || (prev.score == s.score && prev.id <= s.id)
        });
        if !keep_prev {
            best.insert(s.test_id, s);
        }
    }
    best
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LessonHomework {
    pub total: usize,
    pub completed: usize,
}

/// A dated `homework_next` grade counts as done once the same student has an oral or
/// written homework grade on a strictly later lesson date.
pub fn lesson_homework_completion(student_id: i64, grades: &[GradeRecord]) -> LessonHomework {
    let own: Vec<&GradeRecord> = grades.iter().filter(|g| g.student_id == student_id).collect();
    let mut total = 0usize;
    let mut completed = 0usize;
    for assigned in own.iter().filter(|g| g.kind == GradeKind::HomeworkNext) {
        let Some(assigned_date) = assigned.lesson_date else {
            continue;
        };
        total += 1;
        let checked_later = own.iter().any(|g| {
            g.kind.is_homework_check() && g.lesson_date.is_some_and(|d| d > assigned_date)
        });
        if checked_later {
            completed += 1;
        }
    }
    LessonHomework { total, completed }
}

#[derive(Debug, Clone)]
pub struct StudentInputs<'a> {
    pub student_id: i64,
    pub group_id: Option<i64>,
    pub attendance: &'a [AttendanceRecord],
    pub grades: &'a [GradeRecord],
    /// Programs of the student's group.
    pub program_ids: &'a [i64],
    pub homeworks: &'a [HomeworkRecord],
    pub homework_submissions: &'a [HomeworkSubmissionRecord],
    pub tests: &'a [TestRecord],
    pub test_submissions: &'a [TestSubmissionRecord],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStatistics {
    pub student_id: i64,
    pub total_lessons: usize,
    pub attended_lessons: usize,
    pub attendance_rate: f64,
    pub average_grade: Option<f64>,
    pub total_grades: usize,
    pub completed_homeworks: usize,
    pub total_homeworks: usize,
    pub completed_tests: usize,
    pub total_tests: usize,
    pub average_test_score: Option<f64>,
}

pub fn compute_student_statistics(input: &StudentInputs<'_>) -> StudentStatistics {
    let sid = input.student_id;

    let attendance = summarize_attendance(input.attendance.iter().filter(|a| a.student_id == sid));
    let own_grades: Vec<GradeRecord> = input
        .grades
        .iter()
        .filter(|g| g.student_id == sid)
        .cloned()
        .collect();
    let grades = lesson_grade_average(own_grades.iter());

    // Without a group the student has no programs, hence no program homeworks or tests.
    let programs: HashSet<i64> = if input.group_id.is_some() {
        input.program_ids.iter().copied().collect()
    } else {
        HashSet::new()
    };

    let program_homeworks: HashSet<i64> = input
        .homeworks
        .iter()
        .filter(|h| programs.contains(&h.program_id))
        .map(|h| h.id)
        .collect();
    let submitted_homeworks: HashSet<i64> = input
        .homework_submissions
        .iter()
        .filter(|s| s.student_id == sid && program_homeworks.contains(&s.homework_id))
        .map(|s| s.homework_id)
        .collect();
    let lesson_hw = lesson_homework_completion(sid, &own_grades);

    let program_tests: HashSet<i64> = input
        .tests
        .iter()
        .filter(|t| programs.contains(&t.program_id))
        .map(|t| t.id)
        .collect();
    let best = best_submissions_by_test(
        input
            .test_submissions
            .iter()
            .filter(|s| s.student_id == sid && program_tests.contains(&s.test_id)),
    );
    let mut completed_tests = 0usize;
    let mut score_sum = 0i128;
    let mut max_sum = 0i128;
    for s in best.values() {
        let Some(score) = s.score else { continue };
        completed_tests += 1;
        score_sum += i128::from(score);
        max_sum += i128::from(s.max_score.unwrap_or(0));
    }
    let average_test_score = if completed_tests > 0 && max_sum > 0 {
        Some(round_2_decimals(score_sum as f64 / max_sum as f64 * 100.0))
    } else {
        None
    };

    StudentStatistics {
        student_id: sid,
        total_lessons: attendance.total,
        attended_lessons: attendance.attended,
        attendance_rate: attendance.rate,
        average_grade: grades.average,
        total_grades: grades.count,
        completed_homeworks: submitted_homeworks.len() + lesson_hw.completed,
        total_homeworks: program_homeworks.len() + lesson_hw.total,
        completed_tests,
        total_tests: program_tests.len(),
        average_test_score,
    }
}

/// One owned group with the rows the storage layer fetched for it.
#[derive(Debug, Clone)]
pub struct GroupSnapshot<'a> {
    pub group: &'a GroupRecord,
    pub student_count: usize,
    pub attendance: &'a [AttendanceRecord],
    pub grades: &'a [GradeRecord],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherGroupStatistics {
    pub group_id: i64,
    pub group_name: String,
    pub total_students: usize,
    pub average_attendance_rate: f64,
    pub average_grade: Option<f64>,
    /// Attendance rows of the group, not distinct dates.
    pub total_lessons: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherStatistics {
    pub teacher_id: i64,
    pub total_groups: usize,
    pub total_students: usize,
    pub groups: Vec<TeacherGroupStatistics>,
}

pub fn compute_teacher_statistics(teacher_id: i64, groups: &[GroupSnapshot<'_>]) -> TeacherStatistics {
    let mut total_students = 0usize;
    let mut out = Vec::with_capacity(groups.len());
    for snap in groups {
        let gid = snap.group.id;
        total_students += snap.student_count;
        let attendance = summarize_attendance(snap.attendance.iter().filter(|a| a.group_id == gid));
        let grades = lesson_grade_average(snap.grades.iter().filter(|g| g.group_id == gid));
        out.push(TeacherGroupStatistics {
            group_id: gid,
            group_name: snap.group.name.clone(),
            total_students: snap.student_count,
            average_attendance_rate: attendance.rate,
            average_grade: grades.average,
            total_lessons: attendance.total,
        });
    }
    TeacherStatistics {
        teacher_id,
        total_groups: groups.len(),
        total_students,
        groups: out,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStudentOverview {
    pub student_id: i64,
    pub full_name: String,
    pub attendance_rate: f64,
    pub average_grade: Option<f64>,
    /// Every grade row of the student, whatever its kind.
    pub total_grades: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupOverview {
    pub group_id: i64,
    pub group_name: String,
    pub total_students: usize,
    pub total_lessons: usize,
    pub students: Vec<GroupStudentOverview>,
}

pub fn compute_group_overview(
    group: &GroupRecord,
    students: &[StudentRecord],
    attendance: &[AttendanceRecord],
    grades_per_student: &HashMap<i64, Vec<GradeRecord>>,
) -> GroupOverview {
    let group_rows: Vec<&AttendanceRecord> =
        attendance.iter().filter(|a| a.group_id == group.id).collect();
    let total_lessons = group_rows
        .iter()
        .map(|a| a.lesson_date)
        .collect::<HashSet<_>>()
        .len();

    let students_out = students
        .iter()
        .map(|s| {
            let att = summarize_attendance(
                group_rows.iter().copied().filter(|a| a.student_id == s.id),
            );
            let grades: &[GradeRecord] = grades_per_student
                .get(&s.id)
                .map(|v| v.as_slice())
                .unwrap_or(&[]);
            let avg = lesson_grade_average(grades.iter());
            GroupStudentOverview {
                student_id: s.id,
                full_name: s.full_name.clone(),
                attendance_rate: att.rate,
                average_grade: avg.average,
                total_grades: grades.len(),
            }
        })
        .collect();

    GroupOverview {
        group_id: group.id,
        group_name: group.name.clone(),
        total_students: students.len(),
        total_lessons,
        students: students_out,
    }
}
