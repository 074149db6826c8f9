use serde::{Deserialize, Serialize};

/// One applicant submission as delivered by the hiring backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSubmission {
    pub applicant_id: i64,
    pub applicant_name: String,
    #[serde(default)]
    pub applicant_email: String,
    pub application_id: i64,
    pub job_posting_id: i64,
    #[serde(default)]
    pub resume_item_answers: Vec<ResumeAnswer>,
    #[serde(default)]
    pub cover_letter_question_answers: Vec<CoverLetterAnswer>,
}

/// An answer to a structured resume field. `item_name` joins into the rule catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeAnswer {
    #[serde(rename = "resumeItemId")]
    pub item_id: i64,
    #[serde(rename = "resumeItemName")]
    pub item_name: String,
    #[serde(rename = "resumeContent", default)]
    pub content: Option<String>,
    #[serde(rename = "selectedCategory", default)]
    pub selected_category: Option<String>,
}

impl ResumeAnswer {
    /// Free text of the answer, empty when absent.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    /// Explicitly selected category, ignoring blank selections.
    pub fn category(&self) -> Option<&str> {
        self.selected_category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// What the report echoes back: the free text, or the category when the text is blank.
    pub fn display_content(&self) -> &str {
        let text = self.text().trim();
        if text.is_empty() {
            self.category().unwrap_or("")
        } else {
            text
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverLetterAnswer {
    #[serde(rename = "coverLetterQuestionId")]
    pub question_id: i64,
    #[serde(rename = "questionContent", default)]
    pub question_content: String,
    #[serde(rename = "answerContent", default)]
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_deserializes_backend_payload() {
        let json = r#"{
            "applicantId": 7,
            "applicantName": "Kim",
            "applicantEmail": "kim@example.com",
            "applicationId": 42,
            "jobPostingId": 3,
            "resumeItemAnswers": [
                {"resumeItemId": 1, "resumeItemName": "학력", "resumeContent": "서울대학교 컴퓨터공학과"},
                {"resumeItemId": 2, "resumeItemName": "수상경력", "selectedCategory": "국제"}
            ],
            "coverLetterQuestionAnswers": [
                {"coverLetterQuestionId": 35, "questionContent": "Why us?", "answerContent": "Because."}
            ]
        }"#;

        let submission: ApplicationSubmission = serde_json::from_str(json).unwrap();
        assert_eq!(submission.application_id, 42);
        assert_eq!(submission.resume_item_answers.len(), 2);
        assert_eq!(submission.resume_item_answers[1].text(), "");
        assert_eq!(submission.resume_item_answers[1].category(), Some("국제"));
        assert_eq!(submission.cover_letter_question_answers[0].question_id, 35);
    }

    #[test]
    fn test_blank_category_is_treated_as_absent() {
        let answer = ResumeAnswer {
            item_id: 1,
            item_name: "수상경력".to_string(),
            content: None,
            selected_category: Some("  ".to_string()),
        };
        assert_eq!(answer.category(), None);
        assert_eq!(answer.display_content(), "");
    }

    #[test]
    fn test_display_content_prefers_text_over_category() {
        let answer = ResumeAnswer {
            item_id: 1,
            item_name: "수상경력".to_string(),
            content: Some("교내 해커톤 대상".to_string()),
            selected_category: Some("교내".to_string()),
        };
        assert_eq!(answer.display_content(), "교내 해커톤 대상");
    }
}
