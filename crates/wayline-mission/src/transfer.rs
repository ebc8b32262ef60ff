use tokio::time::Instant;
use tracing::{debug, info, warn};
use wayline_link::{Link, LinkError, Transport};

use crate::{MissionError, MissionStore, PlanType};

impl MissionStore {
    /// Upload this plan.
    ///
    /// Answers whatever sequence the vehicle requests, repeats included, until the last item
    /// has been sent. Missing requests are tolerated until the store's send budget runs out.
    /// A waypoint plan is then started in AUTO over its whole range.
    pub async fn send<T: Transport>(&self, link: &mut Link<T>) -> Result<(), MissionError> {
        let count = u16::try_from(self.len()).map_err(|_| MissionError::TooManyItems(self.len()))?;
        let mission_type = self.plan().mission_type();
        info!("mission: uploading {} {} items", count, self.plan());
        link.send_mission_count(count, mission_type).await?;

        if let Some(last) = self.last_seq() {
            let deadline = Instant::now() + self.send_timeout();
            loop {
                let now = Instant::now();
                if now >= deadline {
                    warn!("mission: upload budget of {:?} exhausted", self.send_timeout());
                    return Err(LinkError::Timeout.into());
                }
                let wait = link.request_timeout().min(deadline - now);
                let seq = match link.await_mission_request(wait).await {
                    Ok(seq) => seq,
                    Err(LinkError::Timeout) => {
                        debug!("mission: no request within {:?}, still waiting", wait);
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };

                let item = self
                    .items()
                    .iter()
                    .find(|i| i.seq == seq)
                    .ok_or(MissionError::UnknownSequence(seq))?;
                link.send_mission_item(item.to_wire()).await?;
                if seq == last {
                    break;
                }
            }
        }

        link.await_mission_ack().await?;
        info!("mission: {} plan accepted", self.plan());

        if self.plan() == PlanType::Waypoint {
            if let (Some(first), Some(last)) = (self.first_seq(), self.last_seq()) {
                link.set_mode("AUTO").await?;
                link.start_mission(first, last).await?;
            }
        }
        Ok(())
    }

    /// Remove this plan type from the vehicle.
    pub async fn clear<T: Transport>(&self, link: &mut Link<T>) -> Result<(), MissionError> {
        info!("mission: clearing {} plan", self.plan());
        link.send_clear_all(self.plan().mission_type()).await?;
        link.await_mission_ack().await?;
        Ok(())
    }
}
