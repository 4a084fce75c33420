/// Greedily fill lines of `text` up to `width` characters.
///
/// Words are separated by single spaces. A line is broken after the word that takes it
/// past `width`, or right after a word that already contains a newline. Every word that
/// does not end a line is followed by a space, including the last one.
pub fn wrap(text: &str, width: usize) -> String {
    let mut len = 0;
    let mut out = String::with_capacity(text.len() + text.len() / width.max(1));
    for word in text.split(' ') {
        out.push_str(word);
        len += word.chars().count();
        let newline = word.contains('\n');
        if len > width || newline {
            len = 0;
            if !newline {
                out.push('\n');
            }
        } else {
            out.push(' ');
        }
    }
    out
}
