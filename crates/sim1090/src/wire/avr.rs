/// AVR ASCII framing: `*<hex>;` followed by a newline.
pub fn frame(frame_hex: &str) -> String {
    format!("*{frame_hex};\n")
}
