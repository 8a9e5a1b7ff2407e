/// Plano de assinatura oferecido no modal de preços.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub code: &'static str,
    pub name: &'static str,
    pub price_cents: u64,
    /// Limite mensal de visitantes; `None` é ilimitado.
    pub monthly_visitors: Option<u64>,
    /// Limite de domínios; `None` é ilimitado.
    pub domains: Option<u64>,
    pub highlight: bool,
}

pub const PLANS: [Plan; 3] = [
    Plan {
        code: "iniciante",
        name: "Iniciante",
        price_cents: 9_700,
        monthly_visitors: Some(50_000),
        domains: Some(5),
        highlight: false,
    },
    Plan {
        code: "profissional",
        name: "Profissional",
        price_cents: 29_700,
        monthly_visitors: Some(200_000),
        domains: Some(20),
        highlight: true,
    },
    Plan {
        code: "elite",
        name: "Elite",
        price_cents: 59_700,
        monthly_visitors: None,
        domains: None,
        highlight: false,
    },
];

/// Busca por código, sem diferenciar maiúsculas.
pub fn find_plan(code: &str) -> Option<&'static Plan> {
    let code = code.trim().to_lowercase();
    PLANS.iter().find(|plan| plan.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_plan() {
        assert_eq!(find_plan("profissional").map(|p| p.price_cents), Some(29_700));
        assert_eq!(find_plan("Elite").map(|p| p.price_cents), Some(59_700));
        assert_eq!(find_plan(" iniciante ").map(|p| p.price_cents), Some(9_700));
        assert!(find_plan("enterprise").is_none());
    }
}
