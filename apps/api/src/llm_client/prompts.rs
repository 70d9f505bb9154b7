// Prompt templates for the worker's generation steps.
// Placeholders are `{name}` and are filled with `str::replace`.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

pub const RESUME_ANALYSIS_PROMPT: &str = r#"You are reviewing a candidate's resume the way an experienced technical recruiter and an ATS would.

Resume text:
"""
{resume_text}
"""

Return a JSON object with exactly these fields:
{
  "ats_score": integer 0-100, how well the resume would pass automated screening,
  "summary": two or three sentences on the candidate's profile,
  "strengths": array of short strings,
  "weaknesses": array of short strings,
  "suggestions": array of concrete, actionable edits
}

Base every point on the resume text above. Do not invent experience."#;

pub const INTERVIEW_FEEDBACK_PROMPT: &str = r#"You are an interviewer assessing a mock {interview_type} interview for the role of {role}.
Technologies in scope: {tech_stack}.

Transcript (JSON array of turns):
{transcript_json}

Score the candidate strictly. Return a JSON object with exactly these fields:
{
  "total_score": integer 0-100,
  "category_scores": [
    {"name": "Communication Skills", "score": 0-100, "comment": string},
    {"name": "Technical Knowledge", "score": 0-100, "comment": string},
    {"name": "Problem Solving", "score": 0-100, "comment": string},
    {"name": "Cultural Fit", "score": 0-100, "comment": string},
    {"name": "Confidence and Clarity", "score": 0-100, "comment": string}
  ],
  "strengths": array of short strings,
  "areas_for_improvement": array of short strings,
  "final_assessment": one paragraph
}

Only judge what the candidate actually said in the transcript."#;
