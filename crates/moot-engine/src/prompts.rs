//! Prompt text for every generation the engine requests.
//!
//! Prompts are plain `format!` templates. Each returns the full message list
//! for one call: a system message fixing the speaker and a user message with
//! the task.

use moot_llm::Message;
use moot_utils::types::{SectionCode, Side};

/// Phrase every closing statement must end with.
pub const CLOSING_SIGN_OFF: &str = "I rest my case here";

fn counsel(side: Side) -> Message {
    Message::system(format!(
        "You are an experienced Indian trial lawyer representing the {}. \
         The opposing lawyer represents the {}.",
        side.label(),
        side.opponent().label()
    ))
}

#[must_use]
pub fn opening(side: Side, case_details: &str) -> Vec<Message> {
    vec![
        counsel(side),
        Message::user(format!(
            r"Case details:
{case_details}

Give a strong, concise opening statement for the {side} (under 250 words).
Stay strictly within the facts of the case.
Do not add headings such as 'Opening Statement'.",
            side = side.label()
        )),
    ]
}

/// Prompt for one argument round.
///
/// `last_argument` is the statement being answered. For the plaintiff it is
/// the instruction to present the round, for the defendant the plaintiff's
/// argument from the same round.
#[must_use]
pub fn round(side: Side, case_details: &str, history: &str, last_argument: &str) -> Vec<Message> {
    vec![
        counsel(side),
        Message::user(format!(
            r#"Case details:
{case_details}

Argument history so far:
{history}

The last argument made was: "{last_argument}"

Respond directly to the last argument in a logical and coherent manner.
Build on earlier arguments but do not repeat them.
Keep the response under 200 words.
Do not add headings such as 'Counter Argument'."#
        )),
    ]
}

#[must_use]
pub fn plaintiff_round_instruction(round: usize) -> String {
    format!("Plaintiff, present your round {round} argument")
}

#[must_use]
pub fn closing(side: Side, history: &str) -> Vec<Message> {
    vec![
        counsel(side),
        Message::user(format!(
            r#"Full case history:
{history}

Give a powerful closing statement for the {side} (around 250 words).
Summarize your strongest points and highlight the evidence.
End your statement with: "{CLOSING_SIGN_OFF}".
Do not add headings such as 'Closing Statement'."#,
            side = side.label()
        )),
    ]
}

/// Prompt for fresh case content, answered as a JSON object.
#[must_use]
pub fn case_content(section: &SectionCode) -> Vec<Message> {
    vec![
        Message::system(
            "You draft realistic but entirely fictional Indian criminal case files \
             for moot court practice.",
        ),
        Message::user(format!(
            r#"Create one new case under Section {section} of the Indian Penal Code.

Reply with a single JSON object and nothing else:
{{"cnr": "<16 character case number record>", "title": "<Complainant v. Accused>", "details": "<150 to 300 words: parties, background, alleged offence, evidence, relief sought>"}}"#
        )),
    ]
}

/// Inputs for a judgment.
#[derive(Debug, Clone, Copy)]
pub struct VerdictContext<'a> {
    pub title: &'a str,
    pub details: &'a str,
    pub history: &'a str,
    pub plaintiff_closing: &'a str,
    pub defendant_closing: &'a str,
}

#[must_use]
pub fn verdict(ctx: &VerdictContext<'_>) -> Vec<Message> {
    vec![
        Message::system(
            "You are an impartial judge presiding over a courtroom in India. You have \
             received a case and the closing statements of both lawyers.",
        ),
        Message::user(format!(
            r"Draft a clear, professional judgment in the standard structure of Indian
judgments. Use markdown for every section header.

---
**CASE TITLE:** {title}
**COURT:** [court name]
**DATE OF HEARING:** [DD Month YYYY]
---

**1. FACTS**
Summarize the essential facts: parties, background, relief sought, procedural history.
**Case Description:**
{details}

**Case Argument History:**
{history}

**2. ISSUES**
Number and list the legal questions to be decided.

**3. ARGUMENTS BY PLAINTIFF**
**Closing statement from the Plaintiff:**
{plaintiff_closing}

**4. ARGUMENTS BY DEFENDANT**
**Closing statement from the Defendant:**
{defendant_closing}

**5. RELEVANT PRECEDENTS**
List key case law from both sides with holdings and relevance.

**6. LEGAL ANALYSIS**
Evaluate each issue, weigh arguments and evidence, apply legal principles.

**7. COURT'S REASONING**
Explain how evidence and law support the findings.

**8. CONCLUSION & ORDER**
Decide each issue, grant or deny relief, and sign off with the judge's designation and date.

Keep the tone neutral, formal and judicial, with short, legally precise sentences.",
            title = ctx.title,
            details = ctx.details,
            history = ctx.history,
            plaintiff_closing = ctx.plaintiff_closing,
            defendant_closing = ctx.defendant_closing,
        )),
    ]
}
