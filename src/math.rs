/*!
LaTeX math to Unicode text for terminal rendering.

Handles the subset that shows up in generated answers: Greek letters,
operators and relations, super/subscripts, fractions, roots, and text
commands. Anything unknown is passed through by name.
*/

use std::collections::HashMap;
use std::sync::LazyLock;

/// Unicode subscript character mappings
static UNICODE_SUBSCRIPTS: LazyLock<HashMap<char, char>> = LazyLock::new(|| {
    [
        ('0', '₀'),
        ('1', '₁'),
        ('2', '₂'),
        ('3', '₃'),
        ('4', '₄'),
        ('5', '₅'),
        ('6', '₆'),
        ('7', '₇'),
        ('8', '₈'),
        ('9', '₉'),
        ('a', 'ₐ'),
        ('e', 'ₑ'),
        ('i', 'ᵢ'),
        ('j', 'ⱼ'),
        ('o', 'ₒ'),
        ('u', 'ᵤ'),
        ('x', 'ₓ'),
        ('h', 'ₕ'),
        ('k', 'ₖ'),
        ('l', 'ₗ'),
        ('m', 'ₘ'),
        ('n', 'ₙ'),
        ('p', 'ₚ'),
        ('r', 'ᵣ'),
        ('s', 'ₛ'),
        ('t', 'ₜ'),
        ('v', 'ᵥ'),
        ('+', '₊'),
        ('-', '₋'),
        ('=', '₌'),
        ('(', '₍'),
        (')', '₎'),
    ]
    .into_iter()
    .collect()
});

/// Unicode superscript character mappings
static UNICODE_SUPERSCRIPTS: LazyLock<HashMap<char, char>> = LazyLock::new(|| {
    [
        ('0', '⁰'),
        ('1', '¹'),
        ('2', '²'),
        ('3', '³'),
        ('4', '⁴'),
        ('5', '⁵'),
        ('6', '⁶'),
        ('7', '⁷'),
        ('8', '⁸'),
        ('9', '⁹'),
        ('a', 'ᵃ'),
        ('b', 'ᵇ'),
        ('c', 'ᶜ'),
        ('d', 'ᵈ'),
        ('e', 'ᵉ'),
        ('f', 'ᶠ'),
        ('g', 'ᵍ'),
        ('h', 'ʰ'),
        ('i', 'ⁱ'),
        ('j', 'ʲ'),
        ('k', 'ᵏ'),
        ('l', 'ˡ'),
        ('m', 'ᵐ'),
        ('n', 'ⁿ'),
        ('o', 'ᵒ'),
        ('p', 'ᵖ'),
        ('r', 'ʳ'),
        ('s', 'ˢ'),
        ('t', 'ᵗ'),
        ('u', 'ᵘ'),
        ('v', 'ᵛ'),
        ('w', 'ʷ'),
        ('x', 'ˣ'),
        ('y', 'ʸ'),
        ('z', 'ᶻ'),
        ('A', 'ᴬ'),
        ('B', 'ᴮ'),
        ('D', 'ᴰ'),
        ('E', 'ᴱ'),
        ('G', 'ᴳ'),
        ('H', 'ᴴ'),
        ('I', 'ᴵ'),
        ('J', 'ᴶ'),
        ('K', 'ᴷ'),
        ('L', 'ᴸ'),
        ('M', 'ᴹ'),
        ('N', 'ᴺ'),
        ('O', 'ᴼ'),
        ('P', 'ᴾ'),
        ('R', 'ᴿ'),
        ('T', 'ᵀ'),
        ('U', 'ᵁ'),
        ('V', 'ⱽ'),
        ('W', 'ᵂ'),
        ('+', '⁺'),
        ('-', '⁻'),
        ('=', '⁼'),
        ('(', '⁽'),
        (')', '⁾'),
        ('′', '′'),
    ]
    .into_iter()
    .collect()
});

/// `\name` to its Unicode rendering
static SYMBOLS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    [
        // Greek
        ("alpha", "α"),
        ("beta", "β"),
        ("gamma", "γ"),
        ("delta", "δ"),
        ("epsilon", "ϵ"),
        ("varepsilon", "ε"),
        ("zeta", "ζ"),
        ("eta", "η"),
        ("theta", "θ"),
        ("vartheta", "ϑ"),
        ("iota", "ι"),
        ("kappa", "κ"),
        ("lambda", "λ"),
        ("mu", "μ"),
        ("nu", "ν"),
        ("xi", "ξ"),
        ("pi", "π"),
        ("varpi", "ϖ"),
        ("rho", "ρ"),
        ("varrho", "ϱ"),
        ("sigma", "σ"),
        ("varsigma", "ς"),
        ("tau", "τ"),
        ("upsilon", "υ"),
        ("phi", "ϕ"),
        ("varphi", "φ"),
        ("chi", "χ"),
        ("psi", "ψ"),
        ("omega", "ω"),
        ("Gamma", "Γ"),
        ("Delta", "Δ"),
        ("Theta", "Θ"),
        ("Lambda", "Λ"),
        ("Xi", "Ξ"),
        ("Pi", "Π"),
        ("Sigma", "Σ"),
        ("Upsilon", "Υ"),
        ("Phi", "Φ"),
        ("Psi", "Ψ"),
        ("Omega", "Ω"),
        // Operators
        ("times", "×"),
        ("cdot", "·"),
        ("div", "÷"),
        ("pm", "±"),
        ("mp", "∓"),
        ("ast", "∗"),
        ("star", "⋆"),
        ("circ", "∘"),
        ("bullet", "•"),
        ("oplus", "⊕"),
        ("otimes", "⊗"),
        ("cup", "∪"),
        ("cap", "∩"),
        ("wedge", "∧"),
        ("land", "∧"),
        ("vee", "∨"),
        ("lor", "∨"),
        ("neg", "¬"),
        ("lnot", "¬"),
        ("setminus", "∖"),
        // Big operators
        ("sum", "∑"),
        ("prod", "∏"),
        ("coprod", "∐"),
        ("int", "∫"),
        ("iint", "∬"),
        ("iiint", "∭"),
        ("oint", "∮"),
        ("bigcup", "⋃"),
        ("bigcap", "⋂"),
        // Relations
        ("leq", "≤"),
        ("le", "≤"),
        ("geq", "≥"),
        ("ge", "≥"),
        ("neq", "≠"),
        ("ne", "≠"),
        ("approx", "≈"),
        ("equiv", "≡"),
        ("sim", "∼"),
        ("simeq", "≃"),
        ("cong", "≅"),
        ("propto", "∝"),
        ("ll", "≪"),
        ("gg", "≫"),
        ("in", "∈"),
        ("notin", "∉"),
        ("ni", "∋"),
        ("subset", "⊂"),
        ("subseteq", "⊆"),
        ("supset", "⊃"),
        ("supseteq", "⊇"),
        ("perp", "⊥"),
        ("parallel", "∥"),
        ("mid", "∣"),
        // Arrows
        ("to", "→"),
        ("rightarrow", "→"),
        ("leftarrow", "←"),
        ("gets", "←"),
        ("leftrightarrow", "↔"),
        ("Rightarrow", "⇒"),
        ("Leftarrow", "⇐"),
        ("Leftrightarrow", "⇔"),
        ("implies", "⟹"),
        ("iff", "⟺"),
        ("mapsto", "↦"),
        ("uparrow", "↑"),
        ("downarrow", "↓"),
        // Misc
        ("infty", "∞"),
        ("partial", "∂"),
        ("nabla", "∇"),
        ("forall", "∀"),
        ("exists", "∃"),
        ("nexists", "∄"),
        ("emptyset", "∅"),
        ("varnothing", "∅"),
        ("angle", "∠"),
        ("triangle", "△"),
        ("prime", "′"),
        ("hbar", "ℏ"),
        ("ell", "ℓ"),
        ("Re", "ℜ"),
        ("Im", "ℑ"),
        ("aleph", "ℵ"),
        ("degree", "°"),
        ("cdots", "⋯"),
        ("ldots", "…"),
        ("dots", "…"),
        ("vdots", "⋮"),
        ("ddots", "⋱"),
        ("langle", "⟨"),
        ("rangle", "⟩"),
        ("lfloor", "⌊"),
        ("rfloor", "⌋"),
        ("lceil", "⌈"),
        ("rceil", "⌉"),
        ("vert", "|"),
        ("lvert", "|"),
        ("rvert", "|"),
        ("Vert", "‖"),
        ("lbrace", "{"),
        ("rbrace", "}"),
        // Spacing
        ("quad", "  "),
        ("qquad", "    "),
        // Sizing and style hints that have no text form
        ("left", ""),
        ("right", ""),
        ("big", ""),
        ("Big", ""),
        ("bigl", ""),
        ("bigr", ""),
        ("Bigl", ""),
        ("Bigr", ""),
        ("displaystyle", ""),
        ("textstyle", ""),
        ("limits", ""),
        ("nolimits", ""),
    ]
    .into_iter()
    .collect()
});

const DOUBLE_STRUCK: &[(char, char)] = &[
    ('C', 'ℂ'),
    ('H', 'ℍ'),
    ('N', 'ℕ'),
    ('P', 'ℙ'),
    ('Q', 'ℚ'),
    ('R', 'ℝ'),
    ('Z', 'ℤ'),
];

const VULGAR_FRACTIONS: &[(&str, &str, &str)] = &[
    ("1", "2", "½"),
    ("1", "3", "⅓"),
    ("2", "3", "⅔"),
    ("1", "4", "¼"),
    ("3", "4", "¾"),
    ("1", "5", "⅕"),
    ("1", "6", "⅙"),
    ("1", "8", "⅛"),
];

/// Convert a LaTeX math expression (without `$` delimiters) to Unicode text
#[must_use]
pub fn latex_to_unicode(src: &str) -> String {
    let mut parser = Parser {
        chars: src.chars().collect(),
        pos: 0,
    };
    let out = parser.sequence(false);
    out.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    /// Read until end of input, or the closing brace when `in_group`
    fn sequence(&mut self, in_group: bool) -> String {
        let mut out = String::new();

        while let Some(c) = self.peek() {
            match c {
                '}' => {
                    self.pos += 1;
                    if in_group {
                        break;
                    }
                }
                '{' => {
                    self.pos += 1;
                    let inner = self.sequence(true);
                    out.push_str(&inner);
                }
                '\\' => {
                    let command = self.command();
                    out.push_str(&command);
                }
                '^' | '_' => {
                    self.pos += 1;
                    let arg = self.argument();
                    out.push_str(&script(&arg, c == '^'));
                }
                '&' => {
                    self.pos += 1;
                    push_space(&mut out);
                }
                '\'' => {
                    self.pos += 1;
                    out.push('′');
                }
                c if c.is_whitespace() => {
                    self.pos += 1;
                    push_space(&mut out);
                }
                c => {
                    self.pos += 1;
                    out.push(c);
                }
            }
        }

        out
    }

    /// A single-token argument: a group, a command, or one character
    fn argument(&mut self) -> String {
        self.skip_whitespace();
        match self.peek() {
            Some('{') => {
                self.pos += 1;
                self.sequence(true)
            }
            Some('\\') => self.command(),
            Some(c) => {
                self.pos += 1;
                c.to_string()
            }
            None => String::new(),
        }
    }

    fn optional_argument(&mut self) -> Option<String> {
        self.skip_whitespace();
        if self.peek() != Some('[') {
            return None;
        }
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != ']') {
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        if self.peek() == Some(']') {
            self.pos += 1;
        }
        Some(latex_to_unicode(&raw))
    }

    fn command(&mut self) -> String {
        // Skip the backslash
        self.pos += 1;

        let Some(first) = self.peek() else {
            return String::new();
        };

        if !first.is_ascii_alphabetic() {
            self.pos += 1;
            return match first {
                '\\' => "\n".to_string(),
                ',' | ';' | ':' | ' ' => " ".to_string(),
                '!' => String::new(),
                '|' => "‖".to_string(),
                other => other.to_string(),
            };
        }

        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();

        match name.as_str() {
            "frac" | "dfrac" | "tfrac" => {
                let numerator = self.argument();
                let denominator = self.argument();
                fraction(&numerator, &denominator)
            }
            "sqrt" => {
                let index = self.optional_argument();
                let radicand = self.argument();
                let root = match index.as_deref() {
                    Some("3") => "∛".to_string(),
                    Some("4") => "∜".to_string(),
                    Some(n) => format!("{}√", script(n, true)),
                    None => "√".to_string(),
                };
                format!("{root}{}", wrap(&radicand))
            }
            "text" | "textrm" | "textbf" | "textit" | "mbox" | "mathrm" | "mathbf" | "mathit"
            | "mathsf" | "mathtt" | "mathcal" | "boldsymbol" | "operatorname" => self.argument(),
            "mathbb" => self
                .argument()
                .chars()
                .map(|c| {
                    DOUBLE_STRUCK
                        .iter()
                        .find(|(plain, _)| *plain == c)
                        .map_or(c, |(_, struck)| *struck)
                })
                .collect(),
            "hat" | "widehat" => accent(&self.argument(), '\u{0302}'),
            "bar" | "overline" => accent(&self.argument(), '\u{0304}'),
            "vec" => accent(&self.argument(), '\u{20D7}'),
            "dot" => accent(&self.argument(), '\u{0307}'),
            "ddot" => accent(&self.argument(), '\u{0308}'),
            "tilde" | "widetilde" => accent(&self.argument(), '\u{0303}'),
            _ => SYMBOLS
                .get(name.as_str())
                .map_or(name.clone(), |s| (*s).to_string()),
        }
    }
}

fn push_space(out: &mut String) {
    if !out.is_empty() && !out.ends_with([' ', '\n']) {
        out.push(' ');
    }
}

/// Whether `s` reads unambiguously without parentheses
fn is_atom(s: &str) -> bool {
    s.chars().count() <= 1
        || !s
            .chars()
            .any(|c| c.is_whitespace() || "+-−=/±∓×·÷,<>≤≥".contains(c))
}

fn wrap(s: &str) -> String {
    if is_atom(s) {
        s.to_string()
    } else {
        format!("({s})")
    }
}

fn fraction(numerator: &str, denominator: &str) -> String {
    if let Some((_, _, glyph)) = VULGAR_FRACTIONS
        .iter()
        .find(|(n, d, _)| *n == numerator && *d == denominator)
    {
        return (*glyph).to_string();
    }
    format!("{}/{}", wrap(numerator), wrap(denominator))
}

fn script(arg: &str, superscript: bool) -> String {
    if arg.is_empty() {
        return String::new();
    }

    let table = if superscript {
        &*UNICODE_SUPERSCRIPTS
    } else {
        &*UNICODE_SUBSCRIPTS
    };
    if let Some(mapped) = arg
        .chars()
        .map(|c| table.get(&c).copied())
        .collect::<Option<String>>()
    {
        return mapped;
    }

    let marker = if superscript { '^' } else { '_' };
    if arg.chars().count() == 1 {
        format!("{marker}{arg}")
    } else {
        format!("{marker}({arg})")
    }
}

fn accent(arg: &str, mark: char) -> String {
    if arg.chars().count() == 1 {
        format!("{arg}{mark}")
    } else {
        arg.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greek_and_operators() {
        assert_eq!(latex_to_unicode(r"\alpha + \beta \leq \Omega"), "α + β ≤ Ω");
        assert_eq!(latex_to_unicode(r"a \times b \cdot c"), "a × b · c");
    }

    #[test]
    fn scripts_use_unicode_when_possible() {
        assert_eq!(latex_to_unicode("x^2 + y_i"), "x² + yᵢ");
        assert_eq!(latex_to_unicode("a^{-1}"), "a⁻¹");
        assert_eq!(latex_to_unicode(r"\sum_{i=1}^{n} i"), "∑ᵢ₌₁ⁿ i");
    }

    #[test]
    fn scripts_fall_back_to_markers() {
        assert_eq!(latex_to_unicode(r"e^{i\pi}"), "e^(iπ)");
        assert_eq!(latex_to_unicode("x_q"), "x_q");
    }

    #[test]
    fn fractions() {
        assert_eq!(latex_to_unicode(r"\frac{1}{2}"), "½");
        assert_eq!(latex_to_unicode(r"\frac{a}{b}"), "a/b");
        assert_eq!(latex_to_unicode(r"\frac{a+b}{c-d}"), "(a+b)/(c-d)");
    }

    #[test]
    fn roots() {
        assert_eq!(latex_to_unicode(r"\sqrt{x}"), "√x");
        assert_eq!(latex_to_unicode(r"\sqrt{x+1}"), "√(x+1)");
        assert_eq!(latex_to_unicode(r"\sqrt[3]{8}"), "∛8");
    }

    #[test]
    fn text_and_blackboard() {
        assert_eq!(latex_to_unicode(r"x \in \mathbb{R}"), "x ∈ ℝ");
        assert_eq!(latex_to_unicode(r"\text{if } x > 0"), "if x > 0");
    }

    #[test]
    fn unknown_commands_pass_through() {
        assert_eq!(latex_to_unicode(r"\foo x"), "foo x");
    }

    #[test]
    fn line_breaks_split_rows() {
        assert_eq!(latex_to_unicode(r"a = 1 \\ b = 2"), "a = 1\nb = 2");
    }
}
