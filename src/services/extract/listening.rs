use scraper::{ElementRef, Html};

use super::{collect_text, css, ExtractedGroup, ExtractedQuestion, ListeningSection, ParseError};
use crate::db::types::QuestionKind;

/// Parses a listening practice page. The markup is flatter than the reading
/// variant: `.question-group` nodes carry `.question` children whose number,
/// text and answer each sit in a dedicated child node. Pages without group
/// wrappers get their bare questions wrapped one-question-per-group.
pub(crate) fn parse_listening_detail(html: &str) -> Result<Vec<ListeningSection>, ParseError> {
    let document = Html::parse_document(html);
    let section_sel = css(".question-group");
    let question_sel = css(".question");

    let mut sections = Vec::new();
    for (index, section) in document.select(&section_sel).enumerate() {
        let mut questions = Vec::new();
        for question in section.select(&question_sel) {
            questions.push(parse_question(question)?);
        }
        sections.push(ListeningSection {
            groups: vec![ExtractedGroup {
                context: None,
                title: Some(format!("Part {}", index + 1)),
                questions,
            }],
            section_html: section.html(),
        });
    }

    if !sections.is_empty() {
        return Ok(sections);
    }

    let mut groups = Vec::new();
    for question in document.select(&question_sel) {
        let question = parse_question(question)?;
        groups.push(ExtractedGroup {
            context: None,
            title: Some(question.text.clone()),
            questions: vec![question],
        });
    }
    if groups.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![ListeningSection { groups, section_html: html.to_string() }])
}

fn parse_question(question: ElementRef<'_>) -> Result<ExtractedQuestion, ParseError> {
    let number_sel = css(".question-number");
    let text_sel = css(".question-text");
    let answer_sel = css(".question-answer");

    let raw_number = question.select(&number_sel).next().map(collect_text).unwrap_or_default();
    let number = raw_number
        .trim_end_matches('.')
        .parse::<i32>()
        .map_err(|_| ParseError::BadQuestionNumber { raw: raw_number.clone() })?;
    let text = question.select(&text_sel).next().map(collect_text).unwrap_or_default();
    let answer =
        question.select(&answer_sel).next().map(collect_text).filter(|answer| !answer.is_empty());

    Ok(ExtractedQuestion {
        crawl_qid: None,
        number,
        text,
        kind: QuestionKind::TextInput,
        options: None,
        answer,
    })
}

pub(crate) fn parse_page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let title_sel = css("h1.test-title");
    document.select(&title_sel).next().map(collect_text).filter(|title| !title.is_empty())
}

/// Audio sources in document order; duplicates are kept.
pub(crate) fn extract_audio_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let source_sel = css("audio source");
    document
        .select(&source_sel)
        .filter_map(|source| source.value().attr("src"))
        .map(str::to_string)
        .collect()
}
