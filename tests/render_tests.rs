//! Integration tests for the transcript renderer

use geminichat::render::{markdown_to_sanitized_html, turn_markdown};
use geminichat::{Attachment, Renderer, ThemeMode, Turn};

fn render(turns: &[Turn]) -> Renderer {
    Renderer::from_turns(ThemeMode::Light, turns)
}

mod code_block_tests {
    use super::*;

    #[test]
    fn test_special_characters_in_code_stay_literal() {
        let reply = "Try this:\n```rust\nlet x = a * b_c < d && *p_q_r*;\n```";
        let renderer = render(&[Turn::model(reply)]);

        assert!(
            renderer
                .plain_text()
                .contains("let x = a * b_c < d && *p_q_r*;")
        );

        let html = renderer.body_html();
        assert!(html.contains("<pre><code class=\"language-rust\">"));
        assert!(html.contains("let x = a * b_c &lt; d &amp;&amp; *p_q_r*;"));
        assert!(!html.contains("<em>"));
    }

    #[test]
    fn test_markup_inside_code_is_not_executed() {
        let html = render(&[Turn::model("```html\n<script>alert(1)</script>\n```")]).body_html();
        assert!(!html.contains("<script"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn test_inline_code_keeps_angle_brackets() {
        let html = render(&[Turn::user("wrap it in `<div>` please")]).body_html();
        assert!(html.contains("<code>&lt;div&gt;</code>"));
    }
}

mod math_tests {
    use super::*;

    #[test]
    fn test_inline_math_and_bold() {
        let html = render(&[Turn::model("$a^2+b^2=c^2$ and **bold**")]).body_html();
        assert!(html.contains("<span class=\"math inline\">$a^2+b^2=c^2$</span>"));
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn test_underscores_and_stars_inside_math_survive() {
        let html = render(&[Turn::model("Sum: $x_1 * y_2 * z_3$ done")]).body_html();
        assert!(html.contains("$x_1 * y_2 * z_3$"));
        assert!(!html.contains("<em>"));
    }

    #[test]
    fn test_display_math() {
        let html = render(&[Turn::model("$$\\sum_{i=1}^n i_k$$")]).body_html();
        assert!(html.contains("<span class=\"math display\">$$\\sum_{i=1}^n i_k$$</span>"));
    }
}

mod sanitize_tests {
    use super::*;

    #[test]
    fn test_script_in_model_output_is_inert() {
        let html = render(&[Turn::model("<script>alert(1)</script>hello")]).body_html();
        assert!(!html.contains("<script"));
        assert!(html.contains("hello"));
    }

    #[test]
    fn test_event_handler_markup_is_inert() {
        let html = render(&[Turn::model("<img src=x onerror=alert(1)>")]).body_html();
        assert!(!html.contains("<img"));
    }

    #[test]
    fn test_javascript_link_is_neutralized() {
        let html = markdown_to_sanitized_html("[click](javascript:alert(1)) [ok](https://example.com \"site\")");
        assert!(!html.contains("javascript:"));
        assert!(html.contains("href=\"https://example.com\""));
        assert!(html.contains("title=\"site\""));
    }

    #[test]
    fn test_tables_and_definition_lists_render() {
        let html = markdown_to_sanitized_html("| a | b |\n|---|---|\n| 1 | 2 |\n\nTerm\n\n: Definition\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
        assert!(html.contains("<dt>Term</dt>"));
    }
}

mod view_tests {
    use super::*;

    #[test]
    fn test_roles_render_with_headings_and_markers() {
        let renderer = render(&[
            Turn::user("hi"),
            Turn::model("hello"),
            Turn::system("The conversation was reset."),
            Turn::error("QuotaExceeded - slow down"),
        ]);
        let html = renderer.body_html();
        assert!(html.contains("<h3>You</h3>"));
        assert!(html.contains("<h3>Model</h3>"));
        assert!(html.contains("<em>The conversation was reset.</em>"));
        assert!(html.contains("<strong>QuotaExceeded - slow down</strong>"));
        assert_eq!(html.matches("<hr>").count(), 4);
        assert_eq!(
            renderer.plain_text(),
            "[You]: hi\n[Model]: hello\n[System]: The conversation was reset.\n[Error]: QuotaExceeded - slow down\n"
        );
    }

    #[test]
    fn test_incremental_matches_bulk() {
        let turns = [Turn::user("one"), Turn::model("two *three*")];
        let mut incremental = Renderer::new(ThemeMode::Light);
        for turn in &turns {
            incremental.push_turn(turn);
        }
        assert_eq!(incremental.view(), render(&turns).view());
    }

    #[test]
    fn test_theme_changes_only_the_stylesheet() {
        let turns = [Turn::model("same **content**")];
        let light = Renderer::from_turns(ThemeMode::Light, &turns);
        let dark = Renderer::from_turns(ThemeMode::Dark, &turns);
        assert_eq!(light.body_html(), dark.body_html());
        assert_ne!(light.sanitized_html(), dark.sanitized_html());
        assert!(dark.sanitized_html().contains(&dark.body_html()));
    }

    #[test]
    fn test_stored_markdown_is_reused() {
        let turns = [Turn::user("hello")];
        let stored = format!("{}{}", turn_markdown(&turns[0]), "### Model\n\n*styled*\n\n---\n\n");
        let renderer = Renderer::from_markdown(ThemeMode::Light, stored.clone(), &turns);
        assert_eq!(renderer.markdown_source(), stored);
        assert_eq!(renderer.plain_text(), "[You]: hello\n");
        assert!(renderer.body_html().contains("<em>styled</em>"));
    }

    #[test]
    fn test_attachment_turn_display() {
        let turn = Turn::user_with_attachment(Attachment::new("audio/mpeg", "/music/song.mp3"), "transcribe");
        let html = render(&[turn]).body_html();
        assert!(html.contains("&lt;audio/mpeg&gt;: song.mp3"));
        assert!(html.contains("transcribe"));
    }
}

mod boundary_tests {
    use super::*;

    #[test]
    fn test_unclosed_fence_stays_inside_its_turn() {
        let renderer = render(&[
            Turn::model("Here:\n```python\nprint(1)"),
            Turn::user("hello **bold**"),
        ]);
        let html = renderer.body_html();
        assert!(html.contains("<pre><code class=\"language-python\">print(1)\n</code></pre>"));
        assert!(html.contains("<h3>You</h3>"));
        assert!(html.contains("<strong>bold</strong>"));
        assert_eq!(html.matches("<hr>").count(), 2);
    }

    #[test]
    fn test_lone_display_delimiter_does_not_pair_across_turns() {
        let html = render(&[
            Turn::model("In bash the pid is $$ here"),
            Turn::user("hello **bold**"),
            Turn::model("and $$x$$"),
        ])
        .body_html();
        assert!(html.contains("<h3>You</h3>"));
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<span class=\"math display\">$$x$$</span>"));
        assert!(!html.contains("<span class=\"math display\">$$ here"));
    }

    #[test]
    fn test_lone_inline_delimiter_does_not_pair_across_turns() {
        let html = render(&[Turn::model("It costs $5"), Turn::user("see **fine** $")]).body_html();
        assert!(!html.contains("math inline"));
        assert!(html.contains("<strong>fine</strong>"));
    }

    #[test]
    fn test_reloaded_transcript_keeps_turns_apart() {
        let turns = [
            Turn::model("```\nunterminated"),
            Turn::user("after **that**"),
        ];
        let saved = render(&turns).markdown_source().to_string();
        let html = Renderer::from_markdown(ThemeMode::Light, saved, &turns).body_html();
        assert!(html.contains("<h3>You</h3>"));
        assert!(html.contains("<strong>that</strong>"));
    }

    #[test]
    fn test_system_notice_with_list_keeps_list() {
        let html = render(&[Turn::system("Unsupported files:\n- setup.exe\n- blob")]).body_html();
        assert!(html.contains("<li><em>setup.exe</em></li>"));
        assert!(html.contains("<em>Unsupported files:</em>"));
    }
}
