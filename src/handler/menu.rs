use crate::step::{MenuOption, StepOutcome, Texts};

pub const INVALID_SELECTION: &str =
    "❌ Opción inválida. Por favor, seleccione una opción válida.";
const SELECTION_HINT: &str = "💡 Responde con el número o nombre de la opción";

/// Menu/options step. Without input it lists the options and blocks. With
/// input it resolves a selection by, in order: 1-based numeric index,
/// case-insensitive exact match on the option value, case-insensitive
/// substring match against the label — first match wins, in listed order.
/// No match re-renders the menu behind an invalid-selection notice.
pub fn execute(text: Option<&Texts>, options: &[MenuOption], input: Option<&str>) -> StepOutcome {
    if let Some(selection) = input {
        if let Some(option) = resolve(options, selection) {
            return StepOutcome::advance(Vec::new(), Some(option.next.clone()));
        }
        let mut messages = vec![INVALID_SELECTION.to_string()];
        messages.push(render_menu(text, options));
        return StepOutcome::block(messages);
    }

    StepOutcome::block(vec![render_menu(text, options)])
}

fn resolve<'a>(options: &'a [MenuOption], selection: &str) -> Option<&'a MenuOption> {
    // Numeric index first: "2" always means the second listed option, no
    // matter what the labels say.
    if selection.chars().all(|c| c.is_ascii_digit()) && !selection.is_empty() {
        if let Ok(n) = selection.parse::<usize>() {
            if n >= 1 && n <= options.len() {
                return Some(&options[n - 1]);
            }
        }
    }

    let lowered = selection.to_lowercase();
    if let Some(option) = options.iter().find(|o| o.value.to_lowercase() == lowered) {
        return Some(option);
    }
    options.iter().find(|o| o.label.to_lowercase().contains(&lowered))
}

fn render_menu(text: Option<&Texts>, options: &[MenuOption]) -> String {
    let listing: Vec<String> = options
        .iter()
        .enumerate()
        .map(|(i, o)| format!("  {}. {}", i + 1, o.label))
        .collect();
    // One-or-many header texts collapse into one block above the listing.
    let header = text.map(|t| t.to_vec().join("\n")).unwrap_or_default();
    if header.is_empty() {
        format!("{}\n\n{}", listing.join("\n"), SELECTION_HINT)
    } else {
        format!("{}\n{}\n\n{}", header, listing.join("\n"), SELECTION_HINT)
    }
}
