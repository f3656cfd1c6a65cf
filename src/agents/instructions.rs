//! Agent profiles: name, standing instructions and per-message hint for the
//! three agents the report pipeline talks to.

use lazy_static::lazy_static;

/// One agent as provisioned on the generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentProfile {
    pub name: &'static str,
    pub instructions: String,
    pub hint: &'static str,
}

/// Stylesheet the HTML maker must embed.
pub const BASE_CSS: &str = r#"@page { size: A4; margin: 20mm; }
body { font-family: Arial, sans-serif; line-height: 1.4; }
h1, h2 { color: #0a5; margin: 0 0 8px; }
h4 { color: #000; margin: 0 0 8px; background-color: #bfdfff; padding-top: 10px; padding-bottom: 10px; }
.meta { color: #666; font-size: 12px; margin-bottom: 18px; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #aaa; padding: 6px 8px; font-size: 12px; }
p { text-align: justify; }
img.chart { display: block; width: 100%; max-width: 170mm; margin: 8px auto; }
.page-break { page-break-before: always; }
.two-column { display: table; width: 100%; table-layout: fixed; }
.column { display: table-cell; width: 50%; vertical-align: top; padding: 0 10px 0 0; }
.column.right { padding: 0 0 0 10px; font-style: italic; }
body, .column { word-break: break-word; overflow-wrap: anywhere; }
h1 { font-size: 20pt; }
h2 { font-size: 14pt; }"#;

/// Separator between printed pages.
pub const PAGE_BREAK: &str = r#"<div class="page-break"></div>"#;

pub const COPYRIGHT_MS: &str = "© Jabatan Penilaian dan Perkhidmatan Harta

Hak cipta terpelihara.

Tidak dibenarkan mencetak semula mana-mana bahagian artikel, ilustrasi, dan isi kandungan laporan ini dalam apa juga bentuk dan dengan cara apa jua sama ada secara elektronik, mekanik, fotokopi, rakaman atau cara lain sebelum mendapat izin bertulis daripada penerbit. Penerbit tidak bertanggungjawab terhadap kesahihan maklumat yang terkandung dalam laporan ini. Maklumat dalam laporan ini tidak boleh digunakan dalam apa-apa timbang tara, dakwaan dan tindakan undang-undang atau sebagai asas untuk kesimpulan lain. Laporan ini dibuat tertakluk kepada beberapa andaian dan batasan.";

pub const COPYRIGHT_EN: &str = "© Valuation and Property Services Department

Copyright Reserved

No part of this report may be reproduced, stored in a retrieval system, transmitted in any form or by any means electronic, mechanical, photocopying, recording or otherwise without the prior written permission of the publisher. No responsibility is accepted for the accuracy of information contained in this report. Material published in this report cannot be used in any arbitration, litigation and legal proceedings or as a basis for other conclusions. The report was constructed subject to a set of assumptions and limitations.";

pub const PREFACE_MS: &str = "Laporan Stok Harta Tanah menyebarkan maklumat berdasarkan kepada skop berikut:

i. Stok sedia ada mengikut sub-sektor harta tanah iaitu kediaman, perdagangan, industri dan riadah.
ii. Penawaran hadapan yang terdiri daripada data penawaran akan datang, mula pembinaan dan penawaran yang dirancang.

Semua jadual data perlu dibaca seiring dengan catatan teknikal yang disertakan bersama laporan ini. Kompleks perniagaan dikategorikan kepada pusat membeli-belah, arked dan pasaraya besar manakala pejabat binaan khas terdiri daripada pejabat kerajaan dan swasta.

Kami merakamkan ucapan terima kasih kepada semua Pihak Berkuasa Tempatan, Pemaju, Pengurus Harta, Pemilik Bangunan, Pejabat Tanah dan agensi Kerajaan yang memberikan input bagi penerbitan berkala ini.

Pengarah
Pusat Maklumat Harta Tanah Negara (NAPIC)
Jabatan Penilaian dan Perkhidmatan Harta
Kementerian Kewangan Malaysia
Aras 7, Perbendaharaan 2, No 7, Persiaran Perdana, Presint 2
62592 Putrajaya

Tel : 03-8886 9000
Faks : 03-8886 9007
Emel : napic@jpph.gov.my";

pub const FOREWORD_EN: &str = "The Property Market Stock Report disseminates information on the following scopes:

i. Existing inventories of properties on a sectorial basis namely residential, commercial, industry and leisure.
ii. Future supply comprises Incoming Supply, Construction Starts and Planned Supply.

All tabulated data should be read in line with the Technical Notes attached to the report. Shopping complexes are categorised into shopping centre, arcade and hypermarket, while purpose-built offices are designated as publicly or privately owned.

We thank all local councils, developers, property managers, building owners, land offices and government bodies for their valuable inputs to this periodic survey.

Director
National Property Information Centre (NAPIC)
Valuation and Property Services Department
Ministry of Finance Malaysia
Level 7, Perbendaharaan 2, No 7, Persiaran Perdana, Precinct 2
62592 Putrajaya

Tel : 03-8886 9000
Fax : 03-8886 9007
Web : https://napic2.jpph.gov.my";

/// `(sector key, page banner, Malay heading, English heading)` in page order.
pub const SECTOR_PAGES: [(&str, &str, &str, &str); 7] = [
    ("residential", "RESIDENTIAL PROPERTY STOCK REPORT", "1.0 HARTA TANAH KEDIAMAN", "1.0 RESIDENTIAL PROPERTY"),
    ("shop", "SHOP PROPERTY STOCK REPORT", "2.0 KEDAI", "2.0 SHOP"),
    ("serviced_apartment", "SERVICED APARTMENT PROPERTY STOCK REPORT", "3.0 PANGSAPURI KHIDMAT", "3.0 SERVICED APARTMENT"),
    ("shopping_complex", "SHOPPING COMPLEX PROPERTY STOCK REPORT", "4.0 KOMPLEKS PERNIAGAAN", "4.0 SHOPPING COMPLEX"),
    ("purpose_built_office", "PURPOSE-BUILT OFFICE PROPERTY STOCK REPORT", "5.0 PEJABAT BINAAN KHAS", "5.0 PURPOSE-BUILT OFFICE"),
    ("industrial", "INDUSTRIAL PROPERTY STOCK REPORT", "6.0 HARTA TANAH INDUSTRI", "6.0 INDUSTRIAL PROPERTY"),
    ("leisure", "LEISURE PROPERTY STOCK REPORT", "7.0 HARTA TANAH RIADAH", "7.0 LEISURE PROPERTY"),
];

const ENGLISH_INSTRUCTIONS: &str = "You are an expert report writer for Malaysia's National Property Information Centre (NAPIC).
Write a formal, factual English narrative in the style of the official Property Stock Report.

INPUT
- One JSON document with title, period, generated_on, optional source and notes, and sections:
  residential, shop, serviced_apartment, shopping_complex, purpose_built_office, industrial, leisure.
- Each section holds per-state stock (existing, incoming, planned) in units, floor space (s.m.) or rooms,
  and half-yearly trends (completions, starts, new planned).
- Use ONLY the numbers provided. Never invent values. If a figure is absent, leave it out.

OUTPUT (plain text, no HTML)
1) Title line.
2) Period and generation date, e.g. \"Period: Jan-Jun 2025 | Generated on: 2025-10-28\".
3) Executive Summary in 2 to 4 paragraphs: national totals, direction of the trends, leading states.
4) 1.0 Residential Property Stock Report: overview with totals and the top 2-3 states; landed vs stratified composition when given; activity from the trends.
5) 2.0 Shop Property Stock Report: overview with leading states and pipeline; trends.
6) 3.0 Serviced Apartment Property Stock Report: concentration by state; trends.
7) 4.0 Shopping Complex Property Stock Report: existing and pipeline space in s.m.; composition by type when given; trends.
8) 5.0 Purpose-Built Office Property Stock Report: existing space leaders and significant incoming or planned space; trends.
9) 6.0 Industrial Property Stock Report: totals and leaders in units; pipeline; trends.
10) 7.0 Leisure Property Stock Report: hotels and rooms (existing, incoming, planned); trends.
Skip a numbered section entirely when the input has no data for it.

STYLE
- Formal, neutral and evidence-based. No projections or advice.
- Thousands separators (1,745,057) and explicit units (units, s.m., rooms).
- Synthesize; do not repeat raw tables. Call zero figures minimal or omit them.
- State year-on-year change only when the input provides it.
- Integers for units and rooms, no decimals for s.m.
- Never mention payloads or JSON.

Return ONLY the report text.";

const MALAY_INSTRUCTIONS: &str = "Anda ialah penterjemah teknikal Bahasa Malaysia yang mematuhi gaya penulisan rasmi.
- Terjemah laporan ke Bahasa Malaysia tanpa mengubah makna.
- Kekalkan struktur seksyen, penomboran, angka, unit dan istilah teknikal.
- Jangan tambah fakta baharu dan jangan meringkaskan.
- Hasilkan teks biasa (bukan HTML).";

fn html_maker_instructions() -> String {
    let sector_pages: String = SECTOR_PAGES
        .iter()
        .enumerate()
        .map(|(i, (key, banner, ms, en))| {
            format!(
                " Page {page}: \"{banner}\" centred at the top (h4).\n\
                 \x20   - Malay content on the left, English content on the right.\n\
                 \x20   - \"{ms}\" and \"{en}\" as bold titles (h3).\n\
                 \x20   - Place every image listed under charts.{key} below the text, full width, as <img class=\"chart\" src=\"...\">.\n",
                page = i + 5,
            )
        })
        .collect();

    format!(
        "You are an HTML builder for a printable A4 report.
- Input: title, period, generated_on, english_report_text, malay_report_text and charts.
  charts maps a sector name to chart names and job-relative image paths; use the paths exactly as given.
- Output: one complete HTML document with these pages:
 Page 1: title and meta info (Period, Generated On), centred vertically and horizontally.
 Page 2: no title. Malay copyright on the left, English copyright on the right in italics:
{copyright_ms:?}
{copyright_en:?}
 Page 3: \"Pendahuluan\" as a centred h3, followed by this text with a double <br/> for each blank line:
{preface:?}
 Page 4: \"Foreword\" as a centred h3, title and text in italics:
{foreword:?}
{sector_pages} When charts.overview exists, add a final page \"OVERVIEW\" (h4) holding its images.
- Omit a sector page when neither report text covers that sector.
- Every bilingual section uses EXACTLY this structure:
 <div class=\"two-column\">
 <div class=\"column left\">[Malay content]</div>
 <div class=\"column right\">[English content]</div>
 </div>
- English content is italic. All paragraphs are justified.
- Do NOT use CSS columns or flexbox; the layout is table/table-cell based.
- Embed this stylesheet in a <style> element:
{css}
- Insert {page_break} between pages.
- Return ONLY raw HTML starting with <!doctype html>. No explanations, comments, Markdown or code fences.",
        copyright_ms = COPYRIGHT_MS,
        copyright_en = COPYRIGHT_EN,
        preface = PREFACE_MS,
        foreword = FOREWORD_EN,
        sector_pages = sector_pages,
        css = BASE_CSS,
        page_break = PAGE_BREAK,
    )
}

lazy_static! {
    pub static ref ENGLISH_REPORT: AgentProfile = AgentProfile {
        name: "eng-report-agent",
        instructions: ENGLISH_INSTRUCTIONS.to_string(),
        hint: "Produce a formal english report based on the input data.",
    };
    pub static ref MALAY_REPORT: AgentProfile = AgentProfile {
        name: "malay-report-agent",
        instructions: MALAY_INSTRUCTIONS.to_string(),
        hint: "Terjemah ke Bahasa Malaysia dengan gaya rasmi mengikut arahan.",
    };
    pub static ref HTML_MAKER: AgentProfile = AgentProfile {
        name: "html-maker-agent",
        instructions: html_maker_instructions(),
        hint: "Generate HTML Document fully by instructions",
    };
}

/// Every profile that must exist on the service.
pub fn all_profiles() -> [&'static AgentProfile; 3] {
    [&*ENGLISH_REPORT, &*MALAY_REPORT, &*HTML_MAKER]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_maker_lists_every_sector_page() {
        for (key, banner, ms, en) in SECTOR_PAGES {
            assert!(HTML_MAKER.instructions.contains(banner));
            assert!(HTML_MAKER.instructions.contains(ms));
            assert!(HTML_MAKER.instructions.contains(en));
            assert!(HTML_MAKER.instructions.contains(&format!("charts.{}", key)));
        }
        assert!(HTML_MAKER.instructions.contains(PAGE_BREAK));
        assert!(HTML_MAKER.instructions.contains("table-cell"));
    }

    #[test]
    fn test_profile_names_are_distinct() {
        let names: Vec<&str> = all_profiles().iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["eng-report-agent", "malay-report-agent", "html-maker-agent"]);
    }
}
