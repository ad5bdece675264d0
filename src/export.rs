//! CSV downloads for admins.

use thiserror::Error;
use time::OffsetDateTime;

use crate::db::repositories::{CertificateListing, EvaluationRecordDetail};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV buffer error: {0}")]
    Buffer(String),
}

fn write_rows<I>(header: &[&str], rows: I) -> Result<Vec<u8>, ExportError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Buffer(e.to_string()))
}

pub fn format_timestamp(value: Option<OffsetDateTime>) -> String {
    value
        .map(|t| {
            format!(
                "{:04}-{:02}-{:02} {:02}:{:02}",
                t.year(),
                u8::from(t.month()),
                t.day(),
                t.hour(),
                t.minute()
            )
        })
        .unwrap_or_default()
}

pub fn certificates_csv(rows: &[CertificateListing]) -> Result<Vec<u8>, ExportError> {
    write_rows(
        &[
            "Nomor Sertifikat",
            "Mahasiswa",
            "NIM",
            "Program Studi",
            "Perusahaan",
            "Posisi",
            "Nilai",
            "Status",
            "Tanggal Kelulusan",
        ],
        rows.iter().map(|c| {
            vec![
                c.number.clone(),
                c.student_name.clone(),
                c.student_number.clone(),
                c.study_program.clone(),
                c.company_name.clone(),
                c.position.clone(),
                c.grade.letter().to_string(),
                c.status.as_str().to_string(),
                c.graduation_date.to_string(),
            ]
        }),
    )
}

/// One line per record with every question and answer in order.
pub fn evaluation_results_csv(rows: &[EvaluationRecordDetail]) -> Result<Vec<u8>, ExportError> {
    let max_questions = rows.iter().map(|r| r.questions.0.len()).max().unwrap_or(0);
    let mut header: Vec<String> = [
        "Template",
        "Mahasiswa",
        "NIM",
        "Perusahaan",
        "Supervisor",
        "Email Supervisor",
        "Status",
        "Tanggal Submit",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for i in 1..=max_questions {
        header.push(format!("Pertanyaan {i}"));
        header.push(format!("Jawaban {i}"));
    }
    let header_refs: Vec<&str> = header.iter().map(String::as_str).collect();

    write_rows(
        &header_refs,
        rows.iter().map(|r| {
            let mut line = vec![
                r.template_name.clone(),
                r.student_name.clone(),
                r.student_number.clone(),
                r.company_name.clone(),
                r.supervisor_name.clone(),
                r.supervisor_email.clone(),
                r.status.as_str().to_string(),
                format_timestamp(r.submitted_at),
            ];
            for (i, question) in r.questions.0.iter().enumerate() {
                line.push(question.clone());
                line.push(r.answers.0.get(&i.to_string()).cloned().unwrap_or_default());
            }
            line
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CertificateStatus, EvaluationKind, EvaluationStatus, Grade};
    use sqlx::types::Json;
    use std::collections::BTreeMap;
    use time::macros::{date, datetime};
    use uuid::Uuid;

    #[test]
    fn certificate_report_has_header_and_rows() {
        let rows = vec![CertificateListing {
            id: Uuid::nil(),
            confirmation_id: Uuid::nil(),
            student_id: Uuid::nil(),
            number: "COOP/2026/0001/UTS".into(),
            grade: Grade::B,
            status: CertificateStatus::Issued,
            graduation_date: date!(2026 - 08 - 03),
            student_name: "Sari, W.".into(),
            student_number: "2210511".into(),
            study_program: "Informatika".into(),
            company_name: "PT Nusantara Data".into(),
            position: "Backend Intern".into(),
            period_start: date!(2026 - 02 - 01),
            period_end: date!(2026 - 07 - 31),
        }];
        let text = String::from_utf8(certificates_csv(&rows).unwrap()).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("Nomor Sertifikat,Mahasiswa"));
        let row = lines.next().unwrap();
        assert!(row.contains("\"Sari, W.\""));
        assert!(row.ends_with(",B,issued,2026-08-03"));
    }

    #[test]
    fn evaluation_results_pair_questions_with_answers() {
        let mut answers = BTreeMap::new();
        answers.insert("0".to_string(), "Sangat baik".to_string());
        let rows = vec![EvaluationRecordDetail {
            record_id: Uuid::nil(),
            confirmation_id: Uuid::nil(),
            template_id: Uuid::nil(),
            template_name: "UTS 2026".into(),
            template_kind: EvaluationKind::Uts,
            questions: Json(vec!["Kedisiplinan".into(), "Kerja sama".into()]),
            answers: Json(answers),
            status: EvaluationStatus::Completed,
            submitted_at: Some(datetime!(2026-04-01 09:30 UTC)),
            student_name: "Sari".into(),
            student_number: "2210511".into(),
            company_name: "PT A".into(),
            position: "Backend Intern".into(),
            supervisor_name: "Rina".into(),
            supervisor_email: "rina@a.test".into(),
        }];
        let text = String::from_utf8(evaluation_results_csv(&rows).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].ends_with("Pertanyaan 2,Jawaban 2"));
        assert!(lines[1].contains("2026-04-01 09:30"));
        assert!(lines[1].ends_with("Kedisiplinan,Sangat baik,Kerja sama,"));
    }
}
