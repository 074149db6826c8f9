// Prompt templates for the qualitative evaluator.
// Fill with `.replace("{placeholder}", ..)`; substitute applicant text last so that
// braces typed by the applicant are never treated as placeholders.

use crate::llm_client::prompts::{JSON_ONLY_INSTRUCTION, NONE_PLACEHOLDER, OUTPUT_HEADER};

/// Per-criterion grading prompt.
/// Replace `{criterion_name}`, `{top_grade}`, `{examples}`, then `{answer}`.
pub const ITEM_EVALUATION_TEMPLATE: &str = r#"### 지시:
당신은 신입 BE 개발자 채용 전문가입니다. [지원자 답변]을 [평가 기준]과 [유사 예시]를 참고하여 평가하고, 결과를 반드시 JSON 형식으로만 출력하세요.

### 평가 대상:
[지원자 답변]
{answer}

### 평가 기준: {criterion_name}
- **최고점(EXCELLENT)**: {top_grade}

### 참고 자료:
[유사 예시]
{examples}

### 출력 형식:
{
  "evaluatedContent": "[지원자 답변]에서 [평가 기준]과 가장 관련 깊은 핵심 문장 1개를 그대로 추출. 없다면 '없음'으로 응답.",
  "grade": "평가 결과를 '긍정', '부정', '중립' 중 하나로 평가.",
  "evaluationReason": "평가 근거를 [평가 기준]과 연관 지어 1문장으로 서술."
}
"#;

/// Per-answer summary prompt. Replace `{answer}`.
pub const QUESTION_SUMMARY_TEMPLATE: &str = r#"### 지시:
당신은 채용 전문가입니다. 아래 [문항 답변]의 핵심 내용을 요약하여 [출력 형식]에 맞춰 JSON으로만 출력하세요.

### 평가 대상:
[문항 답변]
{answer}

### 출력 형식:
{
  "keywords": ["답변의 핵심 키워드를 5개 추출하여 리스트 형태로 작성"],
  "summary": "답변 내용을 1~2 문장으로 요약."
}
"#;

/// Cross-cutting analysis prompt. Replace `{report}` with the pretty-printed
/// quantitative scores and per-question results.
pub const OVERALL_ANALYSIS_TEMPLATE: &str = r#"### 지시:
당신은 최고 수준의 채용 전문가입니다. 아래 [지원자 종합 정보]를 바탕으로 지원자를 다각도로 분석하고, 결과를 반드시 JSON 형식으로만 출력하세요.

### 분석 대상:
[지원자 종합 정보]
{report}

### 출력 형식:
{
  "overallEvaluation": "지원자에 대한 종합적인 평가를 1문장으로 요약.",
  "strengths": ["지원자의 강점을 3가지 항목으로 나누어 리스트 형태로 작성"],
  "improvements": ["지원자의 개선점을 2가지 항목으로 나누어 리스트 형태로 작성"],
  "aiRecommendation": "종합적인 판단에 따라 '합격 권장' 또는 '신중한 검토 필요' 또는 '탈락 권장' 중 하나로 결론.",
  "aiReliability": "현재 분석 결과에 대한 AI의 신뢰도를 0.0에서 1.0 사이의 소수점 두 자리 숫자로 표현. (예: 0.87)"
}
"#;

fn finish(body: String) -> String {
    format!("{body}\n{JSON_ONLY_INSTRUCTION}\n\n{OUTPUT_HEADER}")
}

/// Bulleted reference snippets, or the placeholder when there are none.
pub fn format_examples(examples: &[String]) -> String {
    if examples.is_empty() {
        return NONE_PLACEHOLDER.to_string();
    }
    examples
        .iter()
        .map(|example| format!("- {example}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn item_evaluation_prompt(
    answer: &str,
    criterion_name: &str,
    top_grade: &str,
    examples: &[String],
) -> String {
    finish(
        ITEM_EVALUATION_TEMPLATE
            .replace("{criterion_name}", criterion_name)
            .replace("{top_grade}", top_grade)
            .replace("{examples}", &format_examples(examples))
            .replace("{answer}", answer),
    )
}

pub fn question_summary_prompt(answer: &str) -> String {
    finish(QUESTION_SUMMARY_TEMPLATE.replace("{answer}", answer))
}

pub fn overall_analysis_prompt(report: &str) -> String {
    finish(OVERALL_ANALYSIS_TEMPLATE.replace("{report}", report))
}
