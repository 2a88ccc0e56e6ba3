//! Text-Chunker – zerlegt inkrementellen Text in sprechbare Stuecke
//!
//! Der Inferenzdienst liefert Text tokenweise. Die Synthese soll frueh
//! beginnen, aber nicht mit winzigen Fragmenten gefuettert werden.
//!
//! ## Regeln fuer `drain`
//! ```text
//! Puffer <= max Zeichen              -> nichts (kann noch wachsen)
//! Satzgrenze innerhalb max           -> laengstes Praefix bis zur Grenze
//! keinerlei Satzzeichen im Puffer,   -> bis zum letzten Leerraum im Fenster,
//! oder Puffer > 2 * max                 sonst harter Schnitt bei max
//! sonst                              -> nichts (warten auf Satzzeichen/flush)
//! ```
//!
//! Der Puffer waechst damit nie ueber zwei Fenster hinaus, auch wenn ein
//! einzelnes Delta erst weit hinter dem Fenster ein Satzzeichen enthaelt.
//!
//! Laengen werden in Unicode-Zeichen gezaehlt, Schnitte liegen immer auf
//! Zeichengrenzen.

/// Zeichen nach denen ein Stueck enden darf
const SATZZEICHEN: &[char] = &['.', ',', '!', '?', ';', ':', '…'];

/// Art eines Textstuecks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkArt {
    /// Natuerliche Grenze innerhalb eines Zugs
    Grenze,
    /// Erzwungener Rest am Zugende
    Abschluss,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    pub art: ChunkArt,
}

impl TextChunk {
    pub fn ist_abschluss(&self) -> bool {
        self.art == ChunkArt::Abschluss
    }
}

#[derive(Debug, Clone)]
pub struct TextChunker {
    puffer: String,
    max_zeichen: usize,
}

impl TextChunker {
    pub fn neu(max_zeichen: usize) -> Self {
        Self {
            puffer: String::new(),
            max_zeichen: max_zeichen.max(1),
        }
    }

    pub fn append(&mut self, delta: &str) {
        self.puffer.push_str(delta);
    }

    /// Gibt alle derzeit abtrennbaren Stuecke zurueck
    pub fn drain(&mut self) -> Vec<TextChunk> {
        let mut stuecke = Vec::new();
        while let Some(schnitt) = self.naechster_schnitt() {
            let rest = self.puffer.split_off(schnitt);
            let text = std::mem::replace(&mut self.puffer, rest);
            stuecke.push(TextChunk {
                text,
                art: ChunkArt::Grenze,
            });
        }
        stuecke
    }

    /// Gibt den gesamten Rest als Abschluss-Stueck zurueck (auch leer)
    pub fn flush(&mut self) -> TextChunk {
        TextChunk {
            text: std::mem::take(&mut self.puffer),
            art: ChunkArt::Abschluss,
        }
    }

    /// Verwirft den Puffer (Barge-in)
    pub fn verwerfen(&mut self) {
        self.puffer.clear();
    }

    pub fn ist_leer(&self) -> bool {
        self.puffer.is_empty()
    }

    pub fn ausstehend(&self) -> &str {
        &self.puffer
    }

    /// Byte-Position des naechsten Schnitts oder `None`
    fn naechster_schnitt(&self) -> Option<usize> {
        let zeichen = self.puffer.chars().count();
        if zeichen <= self.max_zeichen {
            return None;
        }

        let mut letzte_grenze = None;
        let mut letzter_leerraum = None;
        let mut fenster_ende = self.puffer.len();

        for (anzahl, (idx, c)) in self.puffer.char_indices().enumerate() {
            if anzahl == self.max_zeichen {
                fenster_ende = idx;
                // Leerraum direkt hinter dem Fenster beendet ein volles Stueck
                if c.is_whitespace() {
                    letzter_leerraum = Some(idx);
                }
                break;
            }
            if SATZZEICHEN.contains(&c) {
                letzte_grenze = Some(idx + c.len_utf8());
            }
            if c.is_whitespace() && anzahl > 0 {
                letzter_leerraum = Some(idx);
            }
        }

        if letzte_grenze.is_some() {
            return letzte_grenze;
        }
        if self.puffer.contains(SATZZEICHEN) && zeichen <= 2 * self.max_zeichen {
            return None;
        }
        letzter_leerraum.or(Some(fenster_ende))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texte(stuecke: &[TextChunk]) -> Vec<&str> {
        stuecke.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn kurzer_puffer_wartet() {
        let mut c = TextChunker::neu(10);
        c.append("Hello,");
        assert!(c.drain().is_empty());
        assert_eq!(c.ausstehend(), "Hello,");
    }

    #[test]
    fn szenario_hello_erst_grenze_dann_abschluss() {
        let mut c = TextChunker::neu(10);
        let mut alle = Vec::new();
        for delta in ["Hello,", " how", " are you?"] {
            c.append(delta);
            alle.extend(c.drain());
        }
        assert_eq!(texte(&alle), vec!["Hello,"]);
        assert_eq!(alle[0].art, ChunkArt::Grenze);

        let rest = c.flush();
        assert_eq!(rest.text, " how are you?");
        assert!(rest.ist_abschluss());
        assert!(c.ist_leer());
    }

    #[test]
    fn laengstes_praefix_bis_satzgrenze() {
        let mut c = TextChunker::neu(20);
        c.append("Hi. Ok, sure. And then more text");
        let stuecke = c.drain();
        assert_eq!(texte(&stuecke), vec!["Hi. Ok, sure."]);
        assert_eq!(c.ausstehend(), " And then more text");
    }

    #[test]
    fn text_ohne_satzzeichen_wird_an_leerraum_geteilt() {
        let mut c = TextChunker::neu(10);
        c.append("alpha beta gamma delta");
        let stuecke = c.drain();
        assert_eq!(texte(&stuecke), vec!["alpha beta", " gamma"]);
        assert_eq!(c.ausstehend(), " delta");
    }

    #[test]
    fn satzzeichen_weit_hinter_dem_fenster_begrenzt_den_puffer() {
        let mut c = TextChunker::neu(10);
        c.append("eins zwei drei vier fuenf sechs.");
        let stuecke = c.drain();
        assert_eq!(texte(&stuecke), vec!["eins zwei", " drei vier"]);
        assert_eq!(c.ausstehend(), " fuenf sechs.");
        assert!(c.ausstehend().chars().count() <= 20);

        let rest = c.flush();
        let gesamt: String = stuecke
            .iter()
            .map(|s| s.text.as_str())
            .chain([rest.text.as_str()])
            .collect();
        assert_eq!(gesamt, "eins zwei drei vier fuenf sechs.");
    }

    #[test]
    fn langes_wort_wird_hart_geschnitten() {
        let mut c = TextChunker::neu(5);
        c.append("abcdefghijkl");
        let stuecke = c.drain();
        assert_eq!(texte(&stuecke), vec!["abcde", "fghij"]);
        assert_eq!(c.ausstehend(), "kl");
    }

    #[test]
    fn mehrbyte_zeichen_werden_nicht_zerteilt() {
        let mut c = TextChunker::neu(4);
        c.append("äöüßäöü");
        let stuecke = c.drain();
        assert_eq!(texte(&stuecke), vec!["äöüß"]);
        assert_eq!(c.ausstehend(), "äöü");
    }

    #[test]
    fn auslassungszeichen_ist_grenze() {
        let mut c = TextChunker::neu(9);
        c.append("Nun… also gut");
        assert_eq!(texte(&c.drain()), vec!["Nun…"]);
    }

    #[test]
    fn leerer_flush() {
        let mut c = TextChunker::neu(10);
        let f = c.flush();
        assert_eq!(f.text, "");
        assert!(f.ist_abschluss());
    }

    #[test]
    fn verwerfen_leert_puffer() {
        let mut c = TextChunker::neu(10);
        c.append("Das wird nie gesprochen");
        c.verwerfen();
        assert!(c.ist_leer());
        assert!(c.drain().is_empty());
    }

    /// Einfacher deterministischer Pseudozufall fuer die Eigenschaftstests
    struct Lcg(u64);

    impl Lcg {
        fn naechste(&mut self, grenze: u64) -> u64 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (self.0 >> 33) % grenze
        }
    }

    const WOERTER: &[&str] = &[
        "ja", "Tisch", "heute", "Abend", "vier", "Personen", "bitte", "danke", "gern",
        "Reservierung", "um", "sieben", "Uhr",
    ];
    const ZEICHEN: &[&str] = &["", "", "", ",", ".", "!", "?"];

    fn zufallstext(rng: &mut Lcg) -> String {
        let mut text = String::new();
        for i in 0..(5 + rng.naechste(30)) {
            if i > 0 {
                text.push(' ');
            }
            text.push_str(WOERTER[rng.naechste(WOERTER.len() as u64) as usize]);
            text.push_str(ZEICHEN[rng.naechste(ZEICHEN.len() as u64) as usize]);
        }
        text
    }

    #[test]
    fn verkettung_ergibt_eingabe() {
        let mut rng = Lcg(7);
        for _ in 0..200 {
            let text = zufallstext(&mut rng);
            let max = 8 + rng.naechste(40) as usize;
            let mut c = TextChunker::neu(max);

            let mut ausgabe = String::new();
            let mut rest = text.as_str();
            while !rest.is_empty() {
                let mut n = 1 + rng.naechste(6) as usize;
                while !rest.is_char_boundary(n.min(rest.len())) {
                    n += 1;
                }
                let (delta, r) = rest.split_at(n.min(rest.len()));
                rest = r;
                c.append(delta);
                for s in c.drain() {
                    assert!(s.text.chars().count() <= max, "Stueck zu lang: {:?}", s.text);
                    ausgabe.push_str(&s.text);
                }
            }
            ausgabe.push_str(&c.flush().text);
            assert_eq!(ausgabe, text);
        }
    }

    #[test]
    fn aufeinanderfolgende_grenzstuecke_passen_nicht_zusammen() {
        let mut rng = Lcg(42);
        for _ in 0..200 {
            let text = zufallstext(&mut rng);
            let max = 8 + rng.naechste(40) as usize;
            let mut c = TextChunker::neu(max);

            let mut stuecke = Vec::new();
            for wort in text.split_inclusive(' ') {
                c.append(wort);
                stuecke.extend(c.drain());
            }

            for paar in stuecke.windows(2) {
                let endet_mit_satzzeichen = paar[1].text.ends_with(SATZZEICHEN);
                if endet_mit_satzzeichen {
                    let zusammen = paar[0].text.chars().count() + paar[1].text.chars().count();
                    assert!(
                        zusammen > max,
                        "{:?} + {:?} passt in {max}",
                        paar[0].text,
                        paar[1].text
                    );
                }
            }
        }
    }
}
