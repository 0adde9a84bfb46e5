use scraper::{ElementRef, Html};

use super::{
    collect_text, css, normalize_block_html, ExtractedGroup, ExtractedQuestion, ParseError,
    ReadingSection,
};
use crate::db::models::ChoiceOption;
use crate::db::types::QuestionKind;

/// Parses a reading practice page into its two-column sections, one per
/// part. The left column carries the passage, the right column the question
/// groups.
pub(crate) fn parse_reading_detail(html: &str) -> Result<Vec<ReadingSection>, ParseError> {
    let document = Html::parse_document(html);
    let section_sel = css(".question-twocols");
    let left_sel = css(".question-twocols-left");
    let right_sel = css(".question-twocols-right");
    let paragraph_sel = css("p");
    let group_sel = css(".question-group-wrapper");

    let mut sections = Vec::new();
    for section in document.select(&section_sel) {
        let left = section
            .select(&left_sel)
            .next()
            .ok_or(ParseError::MissingColumn { column: "left" })?;
        let right = section
            .select(&right_sel)
            .next()
            .ok_or(ParseError::MissingColumn { column: "right" })?;

        let title = left.select(&paragraph_sel).next().map(collect_text).unwrap_or_default();

        let mut groups = Vec::new();
        for group in right.select(&group_sel) {
            groups.push(parse_group(group)?);
        }

        sections.push(ReadingSection {
            title,
            left_column_html: normalize_block_html(&left.inner_html()),
            right_column_html: normalize_block_html(&right.inner_html()),
            groups,
        });
    }
    Ok(sections)
}

fn parse_group(group: ElementRef<'_>) -> Result<ExtractedGroup, ParseError> {
    let context_sel = css(".context-content");
    let question_sel = css(".question-wrapper");

    let context =
        group.select(&context_sel).next().map(collect_text).filter(|text| !text.is_empty());

    let mut questions = Vec::new();
    for question in group.select(&question_sel) {
        questions.push(parse_question(question)?);
    }

    Ok(ExtractedGroup { context, title: None, questions })
}

fn parse_question(question: ElementRef<'_>) -> Result<ExtractedQuestion, ParseError> {
    let number_sel = css(".question-number strong");
    let text_sel = css(".question-text");
    let input_sel = css("input");
    let option_sel = css(".radio-option");
    let label_sel = css("label");

    let crawl_qid = question.value().attr("data-qid").map(str::to_string);
    let raw_number = question.select(&number_sel).next().map(collect_text).unwrap_or_default();
    let number = raw_number
        .parse::<i32>()
        .map_err(|_| ParseError::BadQuestionNumber { raw: raw_number.clone() })?;
    let text = question.select(&text_sel).next().map(collect_text).unwrap_or_default();

    let kind = match question.select(&input_sel).next().and_then(|input| input.value().attr("type"))
    {
        Some("radio") => QuestionKind::SingleChoice,
        _ => QuestionKind::TextInput,
    };

    let options = (kind == QuestionKind::SingleChoice).then(|| {
        question
            .select(&option_sel)
            .map(|option| ChoiceOption {
                value: option
                    .select(&input_sel)
                    .next()
                    .and_then(|input| input.value().attr("value"))
                    .unwrap_or_default()
                    .to_string(),
                label: option.select(&label_sel).next().map(collect_text).unwrap_or_default(),
            })
            .collect::<Vec<_>>()
    });

    Ok(ExtractedQuestion { crawl_qid, number, text, kind, options, answer: None })
}
