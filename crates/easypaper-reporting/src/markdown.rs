use easypaper_core::PaperAnalysis;

pub const REVIEW_MARKER: &str = "(Review Framework)";

/// Fixed report section titles, shared by every paginated format.
pub const SECTION_TITLES: [&str; 10] = [
    "1. Research Question & Hypothesis",
    "2. Research Design",
    "3. Methods & Techniques",
    "4. Analysis Process",
    "5. Results",
    "6. Conclusion",
    "7. Evaluation",
    "8. Limitations & Inspiration",
    "9. Figures & Tables",
    "10. Key References",
];

/// Title of section `index`, with the review marker on the design section.
pub fn section_title(analysis: &PaperAnalysis, index: usize) -> String {
    if index == 1 && analysis.is_review {
        format!("{} {}", SECTION_TITLES[1], REVIEW_MARKER)
    } else {
        SECTION_TITLES[index].to_string()
    }
}

/// The eight narrative sections, in report order.
pub fn narrative(analysis: &PaperAnalysis) -> [&str; 8] {
    [
        analysis.research_question.as_str(),
        analysis.research_design.as_str(),
        analysis.methods.as_str(),
        analysis.analysis_process.as_str(),
        analysis.results.as_str(),
        analysis.conclusion.as_str(),
        analysis.evaluation.as_str(),
        analysis.limitations.as_str(),
    ]
}

/// Render the ten-section report as Markdown.
pub fn render(analysis: &PaperAnalysis) -> String {
    let info = &analysis.basic_info;
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", info.title));
    out.push_str(&format!(
        "**Year**: {} | **First Author**: {}\n",
        info.year, info.first_author
    ));
    out.push_str(&format!(
        "**Journal**: {} ({})\n",
        info.journal, info.volume_issue
    ));
    out.push_str(&format!("**Keywords**: {}\n", info.keywords));

    for (i, body) in narrative(analysis).iter().enumerate() {
        out.push_str(&format!(
            "\n## {}\n{}\n",
            section_title(analysis, i),
            body.trim()
        ));
    }

    out.push_str(&format!("\n## {}\n", SECTION_TITLES[8]));
    for figure in &analysis.figures_tables {
        out.push_str(&format!(
            "- **{} {}**: {}\n",
            figure.number, figure.title, figure.content
        ));
    }

    out.push_str(&format!("\n## {}\n", SECTION_TITLES[9]));
    for reference in &analysis.key_references {
        out.push_str(&format!("- {}\n", reference));
    }

    out
}
