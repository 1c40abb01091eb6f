//! Known positions of the chart.
//! The core positions are the ones the backend stores; department roles are
//! synthesized on the client and only appear in the chart if the backend
//! happens to return them.

/// A known organizational slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PositionDef {
    pub id: &'static str,
    pub title: &'static str,
}

/// A titled group of positions, rendered as one row of cards.
#[derive(Clone, Copy, Debug)]
pub struct Section {
    pub title: &'static str,
    pub positions: &'static [PositionDef],
}

const fn pos(id: &'static str, title: &'static str) -> PositionDef {
    PositionDef { id, title }
}

pub const PRESIDENT_ID: &str = "presidente-nacional";

// *************** Core positions ***************

pub const SECTIONS: &[Section] = &[
    Section {
        title: "MESA DA ASSEMBLEIA GERAL",
        positions: &[
            pos("presidente-assembleia", "Presidente da Assembleia"),
            pos("primeiro-vogal-assembleia", "1º Vogal da Assembleia"),
            pos("segundo-vogal-assembleia", "2º Vogal da Assembleia"),
        ],
    },
    Section {
        title: "DIREÇÃO NACIONAL",
        positions: &[
            pos(PRESIDENT_ID, "Presidente Nacional"),
            pos("vice-presidente-nacional", "Vice-Presidente Nacional"),
            pos("secretario-presidencia", "Secretário da Presidência"),
            pos("primeiro-secretario", "1º Secretário"),
            pos("segundo-secretario", "2º Secretário"),
        ],
    },
    Section {
        title: "CONSELHO FISCAL",
        positions: &[
            pos("presidente-fiscal", "Presidente do Conselho Fiscal"),
            pos("secretario-fiscal", "Secretário do Conselho Fiscal"),
            pos("primeiro-vogal-fiscal", "1º Vogal do Conselho Fiscal"),
            pos("segundo-vogal-fiscal", "2º Vogal do Conselho Fiscal"),
        ],
    },
    Section {
        title: "CONSELHO CONSULTIVO",
        positions: &[
            pos("primeiro-conselheiro", "1º Conselheiro"),
            pos("segundo-conselheiro", "2º Conselheiro"),
        ],
    },
];

// *************** Department roles ***************

pub const DEPARTMENTS: &[Section] = &[
    Section {
        title: "DEPARTAMENTO FINANCEIRO",
        positions: &[
            pos("diretor-financeiro", "Diretor Financeiro"),
            pos("contador-chefe", "Contador Chefe"),
            pos("assistente-financeiro", "Assistente Financeiro"),
        ],
    },
    Section {
        title: "DEPARTAMENTO DE RECURSOS HUMANOS",
        positions: &[
            pos("diretor-rh", "Diretor de RH"),
            pos("recrutador-senior", "Recrutador Sênior"),
            pos("especialista-treinamento", "Especialista em Treinamento"),
        ],
    },
    Section {
        title: "DEPARTAMENTO TÉCNICO",
        positions: &[
            pos("diretor-tecnico", "Diretor Técnico"),
            pos("engenheiro-senior", "Engenheiro Sênior"),
            pos("tecnico-especializado", "Técnico Especializado"),
        ],
    },
    Section {
        title: "DEPARTAMENTO COMERCIAL",
        positions: &[
            pos("diretor-comercial", "Diretor Comercial"),
            pos("gerente-vendas", "Gerente de Vendas"),
            pos("representante-comercial", "Representante Comercial"),
        ],
    },
];

/// Ids of every core position, in display order.
pub fn core_ids() -> impl Iterator<Item = &'static str> {
    SECTIONS
        .iter()
        .flat_map(|s| s.positions.iter())
        .map(|p| p.id)
}

/// Looks a position up in both the core and department tables.
pub fn lookup(id: &str) -> Option<&'static PositionDef> {
    SECTIONS
        .iter()
        .chain(DEPARTMENTS.iter())
        .flat_map(|s| s.positions.iter())
        .find(|p| p.id == id)
}

pub fn is_department(id: &str) -> bool {
    DEPARTMENTS
        .iter()
        .flat_map(|s| s.positions.iter())
        .any(|p| p.id == id)
}

/// Display title for an id, falling back to the id itself.
pub fn title_of(id: &str) -> &str {
    lookup(id).map(|p| p.title).unwrap_or(id)
}
