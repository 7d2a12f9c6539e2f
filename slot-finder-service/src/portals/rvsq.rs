//! RVSQ (Rendez-vous santé Québec) portal flow.
//!
//! ASP.NET form with a family-physician branch: patients with a registered
//! physician go through an intermediate GMF (family-medicine group) step,
//! patients without one search nearby clinics within a 50 km radius.

use std::time::Duration;

use async_trait::async_trait;
use portal_flow::{
    BranchDecision, BrowserSession, MarkerSet, PatientProfile, PortalError, Probe, Result,
    Selector, Settle,
};
use tracing::info;

const FORM_URL: &str = "https://rvsq.gouv.qc.ca/prendrerendezvous/Principale.aspx";

const ACCEPT_COOKIES: &str = "#btnToutAccepter";
const FIRST_NAME: &str = "#ctl00_ContentPlaceHolderMP_AssureForm_FirstName";
const LAST_NAME: &str = "#ctl00_ContentPlaceHolderMP_AssureForm_LastName";
const NAM: &str = "#ctl00_ContentPlaceHolderMP_AssureForm_NAM";
const CARD_SEQ: &str = "#ctl00_ContentPlaceHolderMP_AssureForm_CardSeqNumber";
const BIRTH_DAY: &str = "#ctl00_ContentPlaceHolderMP_AssureForm_Day";
const BIRTH_MONTH: &str = "#ctl00_ContentPlaceHolderMP_AssureForm_Month";
const BIRTH_YEAR: &str = "#ctl00_ContentPlaceHolderMP_AssureForm_Year";
const CONSENT: &str = "#AssureForm_CSTMT";
const CONTINUE_ENABLED: &str = "#ctl00_ContentPlaceHolderMP_myButton:not([disabled])";
const CONTINUE: &str = "#ctl00_ContentPlaceHolderMP_myButton";

const HAS_PHYSICIAN_BTN: &str = "a.h-SelectAssureBtn.ctx-changer[data-type='1']";
const NO_PHYSICIAN_BTN: &str = "a.h-SelectAssureBtn.ctx-changer[data-type='3']";
const NO_PHYSICIAN_TEXT: &str = "pas de médecin de famille";

const CONSULTING_REASON: &str = "#consultingReason";
const URGENT_CONSULTATION: &str = "ac2a5fa4-8514-11ef-a759-005056b11d6c";
const PERIMETER: &str = "#perimeterCombo";
/// Option value for the 50 km radius.
const PERIMETER_50KM: &str = "4";
const GMF_STEP: &str = "Prendre rendez-vous avec un professionnel de la santé de mon groupe de \
                        médecine de famille (GMF)";
const NEARBY_CLINIC_STEP: &str = "div.thumbnail.tmbArrow.tmbBtn.h-butType3";
const SEARCH_LABEL: &str = "Rechercher";
const POSTAL_CODE: &str = "#PostalCode";
const SEARCH_BUTTON: &str = "button.h-SearchButton.btn.btn-primary";

const NO_SLOTS_SECTION: &str = "#clinicsWithNoDisponibilities";
const NO_SLOTS_SHORT: &str = "Aucun rendez-vous rpondant";
const NO_SLOTS_FULL: &str =
    "Aucun rendez-vous répondant à vos critères de recherche n'est disponible pour le moment.";
const CLINIC_LIST: &str =
    "Les cliniques suivantes offrent des disponibilités pour votre rendez-vous :";

pub struct RvsqFlow {
    markers: MarkerSet,
}

impl RvsqFlow {
    pub fn new() -> Self {
        Self {
            markers: MarkerSet {
                no_slot: vec![
                    // The truncated variant matches the page even when the
                    // accented text renders inconsistently.
                    Probe::Visible(Selector::text(NO_SLOTS_SHORT)),
                    Probe::Visible(Selector::css(NO_SLOTS_SECTION)),
                    Probe::Visible(Selector::text(NO_SLOTS_FULL)),
                ],
                slot_found: vec![Probe::Visible(Selector::text(CLINIC_LIST))],
                // RVSQ reports failures as page errors, not banners.
                error_banner: vec![],
            },
        }
    }

    /// The perimeter select is flaky: plain selection first, then a click
    /// before selecting, then an inline script as the last resort.
    async fn set_perimeter(&self, session: &dyn BrowserSession) -> Result<()> {
        let perimeter = Selector::css(PERIMETER);
        if session
            .select_value(&perimeter, PERIMETER_50KM)
            .await
            .is_ok()
        {
            return Ok(());
        }
        session.click(&perimeter).await?;
        if session
            .select_value(&perimeter, PERIMETER_50KM)
            .await
            .is_ok()
        {
            return Ok(());
        }
        session
            .eval(&perimeter, "arguments[0].value = '4';")
            .await
    }
}

impl Default for RvsqFlow {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl portal_flow::PortalFlow for RvsqFlow {
    fn name(&self) -> &str {
        "rvsq"
    }

    fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    async fn setup(&self, session: &dyn BrowserSession, profile: &PatientProfile) -> Result<()> {
        info!("navigating to form page");
        session.goto(FORM_URL, Settle::NetworkIdle).await?;
        session.click(&Selector::css(ACCEPT_COOKIES)).await?;

        info!("filling identity form");
        session
            .fill(&Selector::css(FIRST_NAME), &profile.first_name)
            .await?;
        session
            .fill(&Selector::css(LAST_NAME), &profile.last_name)
            .await?;
        session.fill(&Selector::css(NAM), &profile.nam).await?;
        session
            .fill(&Selector::css(CARD_SEQ), &profile.card_seq_number)
            .await?;
        session
            .fill(&Selector::css(BIRTH_DAY), &profile.birth_day)
            .await?;
        session
            .select_value(&Selector::css(BIRTH_MONTH), &profile.birth_month)
            .await?;
        session
            .fill(&Selector::css(BIRTH_YEAR), &profile.birth_year)
            .await?;
        session.set_checked(&Selector::css(CONSENT)).await?;

        session
            .wait_visible(&Selector::css(CONTINUE_ENABLED), Duration::from_secs(60))
            .await?;
        session.click(&Selector::css(CONTINUE)).await?;
        session
            .wait_settle(Settle::NetworkIdle, Duration::from_secs(60))
            .await?;
        Ok(())
    }

    async fn resolve_branch(&self, session: &dyn BrowserSession) -> Result<BranchDecision> {
        session
            .wait_settle(Settle::NetworkIdle, Duration::from_secs(60))
            .await?;
        // The two markers render late; give the page a moment.
        tokio::time::sleep(Duration::from_secs(2)).await;

        let no_physician = session
            .is_visible(&Selector::text(NO_PHYSICIAN_TEXT))
            .await?;
        let has_physician = session
            .is_visible(&Selector::css(HAS_PHYSICIAN_BTN))
            .await?;

        if no_physician {
            Ok(BranchDecision::NoFamilyPhysician)
        } else if has_physician {
            Ok(BranchDecision::FamilyPhysician)
        } else {
            Err(PortalError::BranchAmbiguous)
        }
    }

    async fn configure_search(
        &self,
        session: &dyn BrowserSession,
        _profile: &PatientProfile,
        branch: BranchDecision,
    ) -> Result<()> {
        match branch {
            BranchDecision::FamilyPhysician => {
                info!("family physician detected");
                session.click(&Selector::css(HAS_PHYSICIAN_BTN)).await?;
            }
            BranchDecision::NoFamilyPhysician => {
                info!("no family physician; searching nearby clinics");
                session.click(&Selector::css(NO_PHYSICIAN_BTN)).await?;
            }
            BranchDecision::NotApplicable => {}
        }

        session
            .wait_visible(&Selector::css(CONSULTING_REASON), Duration::from_secs(60))
            .await?;
        tokio::time::sleep(Duration::from_secs(2)).await;

        info!("selecting urgent consultation");
        session.click(&Selector::css(CONSULTING_REASON)).await?;
        session
            .select_value(&Selector::css(CONSULTING_REASON), URGENT_CONSULTATION)
            .await?;

        if branch == BranchDecision::NoFamilyPhysician {
            // Best-effort: the combo is only waited on here; the value is
            // applied after the first search below.
            session
                .wait_visible(&Selector::css(PERIMETER), Duration::from_secs(60))
                .await?;
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        session.click(&Selector::text(SEARCH_LABEL)).await?;
        session
            .wait_settle(Settle::NetworkIdle, Duration::from_secs(60))
            .await?;

        if branch == BranchDecision::FamilyPhysician {
            session.click(&Selector::text(GMF_STEP)).await?;
            session.click(&Selector::text(SEARCH_LABEL)).await?;
            session
                .wait_settle(Settle::NetworkIdle, Duration::from_secs(60))
                .await?;
            session.click(&Selector::css(NEARBY_CLINIC_STEP)).await?;
        } else {
            session.click(&Selector::text(SEARCH_LABEL)).await?;
            session
                .wait_settle(Settle::NetworkIdle, Duration::from_secs(60))
                .await?;
        }

        self.set_perimeter(session).await
    }

    async fn submit_search(
        &self,
        session: &dyn BrowserSession,
        profile: &PatientProfile,
    ) -> Result<()> {
        session
            .fill(&Selector::css(POSTAL_CODE), &profile.postal_code)
            .await?;
        session.click(&Selector::css(SEARCH_BUTTON)).await
    }
}
