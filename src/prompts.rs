//! Prompt templates for analysis extraction and review synthesis.

/// System prompt for any call expecting strict JSON back.
pub const JSON_SYSTEM_PROMPT: &str =
    "You are an expert academic paper analyst. Always respond with valid JSON and nothing else.";

/// System prompt for literature review generation.
pub const REVIEW_SYSTEM_PROMPT: &str =
    "You are an expert academic literature review author.";

/// Build the structured-extraction prompt for one paper's text.
pub fn extraction_prompt(paper_text: &str) -> String {
    format!(
        r#"Read the following academic paper carefully and extract its key information. Return JSON.

Paper text:
{paper_text}

Extract:
1. research_question: the research question (1-2 sentences)
2. methodology: the research methodology (2-3 sentences)
3. main_findings: main findings (3-5 bullet points)
4. key_contributions: key contributions (2-3 bullet points)
5. limitations: limitations of the study (2-3 bullet points)
6. future_work: future research directions (1-2 sentences)
7. keywords: keywords (5-10)

Return exactly this shape:
{{
  "research_question": "...",
  "methodology": "...",
  "main_findings": ["...", "..."],
  "key_contributions": ["...", "..."],
  "limitations": ["...", "..."],
  "future_work": "...",
  "keywords": ["...", "..."]
}}"#
    )
}

/// Build the literature review prompt over a numbered briefs block.
pub fn review_prompt(topic: &str, papers_info: &str) -> String {
    format!(
        r#"Write a structured literature review based on the papers below.

Research topic: {topic}

Papers:
{papers_info}

Requirements:
1. Organize the review as:
   - Background and motivation
   - Main research methods
   - Findings and trends
   - Limitations of existing work
   - Future research directions
2. In each part:
   - Summarize shared trends and patterns
   - Contrast viewpoints across studies
   - Cite specific papers to support claims, using the [n] numbering above
3. Style:
   - Formal academic language
   - Clear, well-ordered argumentation
   - Objective and neutral, no subjective judgments
   - Roughly 1500-2000 words

Begin the review:"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extraction_prompt_embeds_text_and_schema() {
        let p = extraction_prompt("lorem ipsum body");
        assert!(p.contains("lorem ipsum body"));
        assert!(p.contains("\"research_question\""));
        assert!(p.contains("\"keywords\""));
    }

    #[test]
    fn review_prompt_embeds_topic_and_briefs() {
        let p = review_prompt("graph neural networks", "[1] Some Paper");
        assert!(p.contains("graph neural networks"));
        assert!(p.contains("[1] Some Paper"));
        assert!(p.contains("[n]"));
    }
}
