// Normalização e máscaras dos campos do checkout

/// Remove tudo que não for dígito.
pub fn only_digits(input: &str) -> String {
    input.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Máscara progressiva de CPF: 000.000.000-00.
pub fn mask_cpf(input: &str) -> String {
    let d = truncated_digits(input, 11);
    match d.len() {
        0..=3 => d,
        4..=6 => format!("{}.{}", &d[..3], &d[3..]),
        7..=9 => format!("{}.{}.{}", &d[..3], &d[3..6], &d[6..]),
        _ => format!("{}.{}.{}-{}", &d[..3], &d[3..6], &d[6..9], &d[9..]),
    }
}

/// Máscara progressiva de CEP: 00000-000.
pub fn mask_cep(input: &str) -> String {
    let d = truncated_digits(input, 8);
    if d.len() <= 5 {
        d
    } else {
        format!("{}-{}", &d[..5], &d[5..])
    }
}

/// Número do cartão em grupos de quatro dígitos.
pub fn format_card_number(input: &str) -> String {
    let d = truncated_digits(input, 19);
    let mut out = String::with_capacity(d.len() + d.len() / 4);
    for (i, ch) in d.chars().enumerate() {
        if i > 0 && i % 4 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    out
}

/// Validade como MM/AA a partir de até quatro dígitos.
pub fn format_expiry(input: &str) -> String {
    let d = truncated_digits(input, 4);
    if d.len() <= 2 {
        d
    } else {
        format!("{}/{}", &d[..2], &d[2..])
    }
}

fn truncated_digits(input: &str, max: usize) -> String {
    only_digits(input).chars().take(max).collect()
}
