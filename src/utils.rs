// Utility functions

pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Fills the `{page}` placeholder of a page URL template.
pub fn page_url(template: &str, page: u32) -> String {
    template.replace(PAGE_PLACEHOLDER, &page.to_string())
}

/// Makes a scraped link absolute when a base is known and the link is relative.
pub fn absolutize(link: &str, base: Option<&str>) -> String {
    match base {
        Some(base) if !link.starts_with("http://") && !link.starts_with("https://") => {
            let base = base.trim_end_matches('/');
            if link.starts_with('/') {
                format!("{}{}", base, link)
            } else {
                format!("{}/{}", base, link)
            }
        }
        _ => link.to_string(),
    }
}

/// Reads a number out of text that may carry thousands separators ("1 234", "1,234").
pub fn parse_digits(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
