//! Minimal CRUD surface for the Kids records the statistics read.

use crate::access::{self, AccessError};
use crate::ipc::helpers::{
    caller_role, insert_failed, optional_date, optional_i64, optional_str, query_failed,
    required_date, required_i64, required_str, with_conn, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{
    AttendanceRecord, GradeKind, GradeRecord, GroupRecord, StudentRecord, TestSubmissionRecord,
};
use crate::store::{self, NewAttendance, NewGrade};
use rusqlite::Connection;
use serde_json::json;

type HandlerResult = Result<serde_json::Value, HandlerErr>;

fn require_staff(req: &Request) -> Result<(), HandlerErr> {
    access::require_staff(caller_role(req)?)?;
    Ok(())
}

fn ensure_student(conn: &Connection, id: i64) -> Result<StudentRecord, HandlerErr> {
    store::get_student(conn, id)
        .map_err(query_failed)?
        .ok_or_else(|| AccessError::NotFound("student not found").into())
}

fn ensure_group(conn: &Connection, id: i64) -> Result<GroupRecord, HandlerErr> {
    store::get_group(conn, id)
        .map_err(query_failed)?
        .ok_or_else(|| AccessError::NotFound("group not found").into())
}

fn ensure_program(conn: &Connection, id: i64) -> Result<(), HandlerErr> {
    if store::program_exists(conn, id).map_err(query_failed)? {
        Ok(())
    } else {
        Err(AccessError::NotFound("program not found").into())
    }
}

fn group_json(g: &GroupRecord) -> serde_json::Value {
    json!({ "id": g.id, "name": g.name, "teacherId": g.teacher_id })
}

fn student_json(s: &StudentRecord) -> serde_json::Value {
    json!({ "id": s.id, "fullName": s.full_name, "groupId": s.group_id })
}

fn attendance_json(a: &AttendanceRecord) -> serde_json::Value {
    json!({
        "id": a.id,
        "studentId": a.student_id,
        "groupId": a.group_id,
        "lessonDate": a.lesson_date.format("%Y-%m-%d").to_string(),
        "present": a.present,
        "programId": a.program_id,
    })
}

fn grade_json(g: &GradeRecord) -> serde_json::Value {
    json!({
        "id": g.id,
        "studentId": g.student_id,
        "groupId": g.group_id,
        "lessonDate": g.lesson_date.map(|d| d.format("%Y-%m-%d").to_string()),
        "value": g.value,
        "type": g.kind.as_str(),
        "comment": g.comment,
        "programId": g.program_id,
    })
}

fn submission_json(t: &TestSubmissionRecord) -> serde_json::Value {
    json!({
        "id": t.id,
        "testId": t.test_id,
        "studentId": t.student_id,
        "score": t.score,
        "maxScore": t.max_score,
        "approvedForRetake": t.is_approved_for_retake,
    })
}

fn teachers_create(conn: &Connection, req: &Request) -> HandlerResult {
    require_staff(req)?;
    let full_name = required_str(&req.params, "fullName")?;
    let id = store::insert_teacher(conn, &full_name).map_err(|e| insert_failed("teachers", e))?;
    Ok(json!({ "teacherId": id }))
}

fn groups_create(conn: &Connection, req: &Request) -> HandlerResult {
    require_staff(req)?;
    let name = required_str(&req.params, "name")?;
    let teacher_id = optional_i64(&req.params, "teacherId")?;
    if let Some(tid) = teacher_id {
        if !store::teacher_exists(conn, tid).map_err(query_failed)? {
            return Err(AccessError::NotFound("teacher not found").into());
        }
    }
    let id = store::insert_group(conn, &name, teacher_id)
        .map_err(|e| insert_failed("study_groups", e))?;
    Ok(json!({ "groupId": id }))
}

fn groups_list(conn: &Connection, req: &Request) -> HandlerResult {
    caller_role(req)?;
    let groups = store::list_groups(conn).map_err(query_failed)?;
    Ok(json!({ "groups": groups.iter().map(group_json).collect::<Vec<_>>() }))
}

fn students_create(conn: &Connection, req: &Request) -> HandlerResult {
    require_staff(req)?;
    let full_name = required_str(&req.params, "fullName")?;
    let group_id = optional_i64(&req.params, "groupId")?;
    if let Some(gid) = group_id {
        ensure_group(conn, gid)?;
    }
    let id = store::insert_student(conn, &full_name, group_id)
        .map_err(|e| insert_failed("students", e))?;
    Ok(json!({ "studentId": id }))
}

fn students_list(conn: &Connection, req: &Request) -> HandlerResult {
    require_staff(req)?;
    let group_id = required_i64(&req.params, "groupId")?;
    ensure_group(conn, group_id)?;
    let students = store::students_in_group(conn, group_id).map_err(query_failed)?;
    Ok(json!({ "students": students.iter().map(student_json).collect::<Vec<_>>() }))
}

fn programs_create(conn: &Connection, req: &Request) -> HandlerResult {
    require_staff(req)?;
    let group_id = required_i64(&req.params, "groupId")?;
    let title = required_str(&req.params, "title")?;
    ensure_group(conn, group_id)?;
    let id = store::insert_program(conn, group_id, &title)
        .map_err(|e| insert_failed("programs", e))?;
    Ok(json!({ "programId": id }))
}

fn attendance_create(conn: &Connection, req: &Request) -> HandlerResult {
    require_staff(req)?;
    let row = NewAttendance {
        student_id: required_i64(&req.params, "studentId")?,
        group_id: required_i64(&req.params, "groupId")?,
        lesson_date: required_date(&req.params, "lessonDate")?,
        present: req
            .params
            .get("present")
            .and_then(|v| v.as_bool())
            .unwrap_or(true),
        program_id: optional_i64(&req.params, "programId")?,
    };
    ensure_student(conn, row.student_id)?;
    ensure_group(conn, row.group_id)?;
    if let Some(pid) = row.program_id {
        ensure_program(conn, pid)?;
    }
    let id = store::insert_attendance(conn, &row).map_err(|e| insert_failed("attendance", e))?;
    Ok(json!({ "attendanceId": id }))
}

fn attendance_update(conn: &Connection, req: &Request) -> HandlerResult {
    require_staff(req)?;
    let id = required_i64(&req.params, "attendanceId")?;
    let present = match req.params.get("present") {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => Some(
            v.as_bool()
                .ok_or_else(|| HandlerErr::bad_params("present must be a boolean"))?,
        ),
    };
    let program_id = optional_i64(&req.params, "programId")?;
    if let Some(pid) = program_id {
        ensure_program(conn, pid)?;
    }
    let updated = store::update_attendance(conn, id, present, program_id).map_err(|e| {
        tracing::warn!(error = %e, "attendance update failed");
        HandlerErr::new("db_update_failed", e.to_string())
    })?;
    if !updated {
        return Err(AccessError::NotFound("attendance record not found").into());
    }
    Ok(json!({ "ok": true }))
}

fn attendance_list_by_student(conn: &Connection, req: &Request) -> HandlerResult {
    let role = caller_role(req)?;
    let student_id = required_i64(&req.params, "studentId")?;
    access::can_access_student(role, student_id)?;
    let rows = store::attendance_for_student(conn, student_id).map_err(query_failed)?;
    Ok(json!({ "attendance": rows.iter().map(attendance_json).collect::<Vec<_>>() }))
}

fn attendance_list_by_group(conn: &Connection, req: &Request) -> HandlerResult {
    require_staff(req)?;
    let group_id = required_i64(&req.params, "groupId")?;
    let rows = store::attendance_for_group(conn, group_id).map_err(query_failed)?;
    Ok(json!({ "attendance": rows.iter().map(attendance_json).collect::<Vec<_>>() }))
}

fn grades_create(conn: &Connection, req: &Request) -> HandlerResult {
    require_staff(req)?;
    let kind = GradeKind::parse(&required_str(&req.params, "type")?);
    let row = NewGrade {
        student_id: required_i64(&req.params, "studentId")?,
        group_id: required_i64(&req.params, "groupId")?,
        lesson_date: optional_date(&req.params, "lessonDate")?,
        value: required_i64(&req.params, "value")?,
        kind,
        comment: optional_str(&req.params, "comment"),
        program_id: optional_i64(&req.params, "programId")?,
    };
    ensure_student(conn, row.student_id)?;
    ensure_group(conn, row.group_id)?;
    if let Some(pid) = row.program_id {
        ensure_program(conn, pid)?;
    }
    let id = store::insert_grade(conn, &row).map_err(|e| insert_failed("grades", e))?;
    Ok(json!({ "gradeId": id }))
}

fn grades_list_by_student(conn: &Connection, req: &Request) -> HandlerResult {
    let role = caller_role(req)?;
    let student_id = required_i64(&req.params, "studentId")?;
    access::can_access_student(role, student_id)?;
    let rows = store::grades_for_student(conn, student_id).map_err(query_failed)?;
    Ok(json!({ "grades": rows.iter().map(grade_json).collect::<Vec<_>>() }))
}

fn homeworks_create(conn: &Connection, req: &Request) -> HandlerResult {
    require_staff(req)?;
    let program_id = required_i64(&req.params, "programId")?;
    let title = required_str(&req.params, "title")?;
    ensure_program(conn, program_id)?;
    let id = store::insert_homework(conn, program_id, &title)
        .map_err(|e| insert_failed("homeworks", e))?;
    Ok(json!({ "homeworkId": id }))
}

fn homeworks_submit(conn: &Connection, req: &Request) -> HandlerResult {
    let role = caller_role(req)?;
    let homework_id = required_i64(&req.params, "homeworkId")?;
    let student_id = required_i64(&req.params, "studentId")?;
    access::can_access_student(role, student_id)?;
    ensure_student(conn, student_id)?;
    if !store::homework_exists(conn, homework_id).map_err(query_failed)? {
        return Err(AccessError::NotFound("homework not found").into());
    }
    let answer = optional_str(&req.params, "answerText");
    let grade = optional_i64(&req.params, "grade")?;
    let id =
        store::insert_homework_submission(conn, homework_id, student_id, answer.as_deref(), grade)
            .map_err(|e| insert_failed("homework_submissions", e))?;
    Ok(json!({ "submissionId": id }))
}

fn tests_create(conn: &Connection, req: &Request) -> HandlerResult {
    require_staff(req)?;
    let program_id = required_i64(&req.params, "programId")?;
    let title = required_str(&req.params, "title")?;
    ensure_program(conn, program_id)?;
    let id = store::insert_test(conn, program_id, &title).map_err(|e| insert_failed("tests", e))?;
    Ok(json!({ "testId": id }))
}

fn tests_submit(conn: &Connection, req: &Request) -> HandlerResult {
    let role = caller_role(req)?;
    let test_id = required_i64(&req.params, "testId")?;
    let student_id = required_i64(&req.params, "studentId")?;
    access::can_access_student(role, student_id)?;
    ensure_student(conn, student_id)?;
    if !store::test_exists(conn, test_id).map_err(query_failed)? {
        return Err(AccessError::NotFound("test not found").into());
    }
    let score = optional_i64(&req.params, "score")?;
    let max_score = optional_i64(&req.params, "maxScore")?;
    let id = store::insert_test_submission(conn, test_id, student_id, score, max_score)
        .map_err(|e| insert_failed("test_submissions", e))?;
    Ok(json!({ "submissionId": id }))
}

fn tests_list_submissions(conn: &Connection, req: &Request) -> HandlerResult {
    let role = caller_role(req)?;
    let test_id = required_i64(&req.params, "testId")?;
    let student_id = required_i64(&req.params, "studentId")?;
    access::can_access_student(role, student_id)?;
    if !store::test_exists(conn, test_id).map_err(query_failed)? {
        return Err(AccessError::NotFound("test not found").into());
    }
    let rows = store::test_submissions_for_student(conn, student_id).map_err(query_failed)?;
    let out: Vec<_> = rows
        .iter()
        .filter(|s| s.test_id == test_id)
        .map(submission_json)
        .collect();
    Ok(json!({ "submissions": out }))
}

fn tests_approve_retake(conn: &Connection, req: &Request) -> HandlerResult {
    require_staff(req)?;
    let submission_id = required_i64(&req.params, "submissionId")?;
    let updated = store::approve_retake(conn, submission_id).map_err(|e| {
        tracing::warn!(error = %e, "retake approval failed");
        HandlerErr::new("db_update_failed", e.to_string())
    })?;
    if !updated {
        return Err(AccessError::NotFound("test submission not found").into());
    }
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: fn(&Connection, &Request) -> HandlerResult = match req.method.as_str() {
        "teachers.create" => teachers_create,
        "groups.create" => groups_create,
        "groups.list" => groups_list,
        "students.create" => students_create,
        "students.list" => students_list,
        "programs.create" => programs_create,
        "attendance.create" => attendance_create,
        "attendance.update" => attendance_update,
        "attendance.listByStudent" => attendance_list_by_student,
        "attendance.listByGroup" => attendance_list_by_group,
        "grades.create" => grades_create,
        "grades.listByStudent" => grades_list_by_student,
        "homeworks.create" => homeworks_create,
        "homeworks.submit" => homeworks_submit,
        "tests.create" => tests_create,
        "tests.submit" => tests_submit,
        "tests.listSubmissions" => tests_list_submissions,
        "tests.approveRetake" => tests_approve_retake,
        _ => return None,
    };
    Some(with_conn(state, req, f))
}
