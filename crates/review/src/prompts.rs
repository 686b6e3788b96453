use folio_common::Mode;

/// System prompt for the evaluator, per mode.
pub fn system_prompt(mode: Mode) -> &'static str {
    match mode {
        Mode::Basic => {
            "You are an experienced art director reviewing a designer's portfolio. \
             Treat all attached images as one portfolio. Give a balanced review: \
             overall impression, strengths, weaknesses, and three concrete next steps. \
             Finish with a score from 1 to 10."
        },
        Mode::Stylized => {
            "You are a creative director with a sharp eye for visual style. \
             Treat all attached images as one portfolio. Focus on visual language: \
             consistency of style, typography, colour, composition, and how \
             recognisable the author's voice is. Suggest how to make the style \
             stronger. Finish with a score from 1 to 10."
        },
        Mode::Critical => {
            "You are a demanding hiring manager at a top design studio. \
             Treat all attached images as one portfolio. Be direct and critical: \
             name every weak piece and explain why it would fail a review, point out \
             missing case studies, and state whether you would invite the author to \
             an interview. Finish with a score from 1 to 10."
        },
    }
}

/// User instruction sent alongside the images.
pub fn user_prompt(image_count: usize) -> String {
    format!(
        "Here is a portfolio of {image_count} image(s). Review it as a whole. \
         Use short paragraphs, `-` bullet lists and **bold** headings."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_mode_has_distinct_prompt() {
        let prompts: Vec<_> = Mode::ALL.into_iter().map(system_prompt).collect();
        assert_eq!(prompts.len(), 3);
        assert_ne!(prompts[0], prompts[1]);
        assert_ne!(prompts[1], prompts[2]);
        assert!(prompts.iter().all(|p| p.contains("one portfolio")));
    }

    #[test]
    fn user_prompt_mentions_count() {
        assert!(user_prompt(3).contains("3 image(s)"));
    }
}
