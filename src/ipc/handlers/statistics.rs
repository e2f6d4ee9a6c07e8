use crate::access::{self, AccessError};
use crate::ipc::helpers::{caller_role, query_failed, required_i64, with_conn, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{AttendanceRecord, GradeRecord, GroupRecord};
use crate::stats::{self, GroupSnapshot, StudentInputs};
use crate::store;
use rusqlite::Connection;
use serde_json::json;
use std::collections::HashMap;

fn student_statistics(conn: &Connection, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let role = caller_role(req)?;
    let student_id = required_i64(&req.params, "studentId")?;
    access::can_access_student(role, student_id)?;

    let student = store::get_student(conn, student_id)
        .map_err(query_failed)?
        .ok_or(AccessError::NotFound("student not found"))?;

    let attendance = store::attendance_for_student(conn, student_id).map_err(query_failed)?;
    let grades = store::grades_for_student(conn, student_id).map_err(query_failed)?;
    let program_ids = match student.group_id {
        Some(gid) => store::program_ids_for_group(conn, gid).map_err(query_failed)?,
        None => Vec::new(),
    };
    let homeworks = store::homeworks_for_programs(conn, &program_ids).map_err(query_failed)?;
    let homework_submissions =
        store::homework_submissions_for_student(conn, student_id).map_err(query_failed)?;
    let tests = store::tests_for_programs(conn, &program_ids).map_err(query_failed)?;
    let test_submissions =
        store::test_submissions_for_student(conn, student_id).map_err(query_failed)?;

    let out = stats::compute_student_statistics(&StudentInputs {
        student_id,
        group_id: student.group_id,
        attendance: &attendance,
        grades: &grades,
        program_ids: &program_ids,
        homeworks: &homeworks,
        homework_submissions: &homework_submissions,
        tests: &tests,
        test_submissions: &test_submissions,
    });
    tracing::debug!(student_id, rate = out.attendance_rate, "student statistics computed");
    Ok(json!(out))
}

fn teacher_statistics(conn: &Connection, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let role = caller_role(req)?;
    let teacher_id = required_i64(&req.params, "teacherId")?;
    access::can_view_teacher(role, teacher_id)?;

    if !store::teacher_exists(conn, teacher_id).map_err(query_failed)? {
        return Err(AccessError::NotFound("teacher not found").into());
    }

    struct Loaded {
        group: GroupRecord,
        student_count: usize,
        attendance: Vec<AttendanceRecord>,
        grades: Vec<GradeRecord>,
    }

    let mut loaded = Vec::new();
    for group in store::groups_for_teacher(conn, teacher_id).map_err(query_failed)? {
        let student_count = store::students_in_group(conn, group.id)
            .map_err(query_failed)?
            .len();
        let attendance = store::attendance_for_group(conn, group.id).map_err(query_failed)?;
        let grades = store::grades_for_group(conn, group.id).map_err(query_failed)?;
        loaded.push(Loaded {
            group,
            student_count,
            attendance,
            grades,
        });
    }
    let snapshots: Vec<GroupSnapshot<'_>> = loaded
        .iter()
        .map(|l| GroupSnapshot {
            group: &l.group,
            student_count: l.student_count,
            attendance: &l.attendance,
            grades: &l.grades,
        })
        .collect();

    let out = stats::compute_teacher_statistics(teacher_id, &snapshots);
    Ok(json!(out))
}

fn group_overview(conn: &Connection, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let role = caller_role(req)?;
    access::require_staff(role)?;
    let group_id = required_i64(&req.params, "groupId")?;

    let group = store::get_group(conn, group_id)
        .map_err(query_failed)?
        .ok_or(AccessError::NotFound("group not found"))?;
    let students = store::students_in_group(conn, group_id).map_err(query_failed)?;
    let attendance = store::attendance_for_group(conn, group_id).map_err(query_failed)?;
    let mut grades_per_student = HashMap::with_capacity(students.len());
    for s in &students {
        let grades = store::grades_for_student(conn, s.id).map_err(query_failed)?;
        grades_per_student.insert(s.id, grades);
    }

    let out = stats::compute_group_overview(&group, &students, &attendance, &grades_per_student);
    Ok(json!(out))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "statistics.student" => Some(with_conn(state, req, student_statistics)),
        "statistics.teacher" => Some(with_conn(state, req, teacher_statistics)),
        "statistics.groupOverview" => Some(with_conn(state, req, group_overview)),
        _ => None,
    }
}
