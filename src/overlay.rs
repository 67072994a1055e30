//! # Overlay pages
//! Self-polling HTML overlays for broadcast compositing (OBS browser source
//! and friends). Each page polls `/status` at a fixed interval and renders
//! one feed's reading with sign formatting, over/under coloring,
//! magnitude-scaled opacity, and a pulse animation for extreme values.

use crate::feed::Feed;

/// Poll interval baked into the page, in milliseconds.
pub const POLL_MS: u32 = 5_000;

/// CSP for overlay responses: same-origin fetch plus the inline script and
/// style the page carries (browser sources often cannot load external
/// assets).
pub const OVERLAY_CSP: &str = "default-src 'self' 'unsafe-inline'; connect-src 'self'; \
     img-src 'self' data:; style-src 'self' 'unsafe-inline';";

const TEMPLATE: &str = r##"<!doctype html>
<html>
<head>
  <meta charset="utf-8"/>
  <meta http-equiv="Cache-Control" content="no-store"/>
  <style>
    body{
      margin:0;
      width:960px;
      height:540px;
      background:rgba(0,0,0,0);
      font-family: Arial, sans-serif;
      display:flex;
      justify-content:flex-end;
      align-items:flex-start;
      padding:18px 18px;
      box-sizing:border-box;
    }
    #v{
      font-weight:900;
      font-size:64px;
      /* Strong shadow + subtle outline so the value stays readable on bright video */
      text-shadow:
        0 3px 14px rgba(0,0,0,0.95),
        0 0 2px rgba(0,0,0,0.95);
      -webkit-text-stroke: 2px rgba(0,0,0,0.85);
      background:rgba(0,0,0,0.82);
      backdrop-filter: blur(6px);
      border-radius:14px;
      padding:10px 16px;
      display:inline-block;
      color:rgba(255,255,255,0.92);
      animation:none;
      border:1px solid rgba(255,255,255,0.12);
    }
    @keyframes pulse{
      0%{transform:scale(1);}
      50%{transform:scale(1.10);}
      100%{transform:scale(1);}
    }
  </style>
</head>
<body>
  <div id="v">--</div>
  <script>
    const FEED = "__FEED__";
    const POLL_MS = __POLL_MS__;

    function fmt(n){
      if(!Number.isFinite(n)) return "--";
      if(n>0) return "+"+n;
      return ""+n;
    }
    function strength(abs){
      /* Keep a high minimum opacity for readability on light backgrounds */
      if(abs>=60) return 1.0;
      if(abs>=45) return 0.95;
      if(abs>=30) return 0.90;
      if(abs>=15) return 0.85;
      return 0.80;
    }
    function setVal(n){
      const el=document.getElementById("v");
      if(!Number.isFinite(n)){
        el.textContent="--";
        el.style.color="rgba(255,255,255,0.92)";
        el.style.animation="none";
        return;
      }
      el.textContent=fmt(n);
      const abs=Math.abs(n);
      const op=strength(abs);

      /* Over = RED, Under = GREEN */
      if(n>0) el.style.color="rgba(255,60,60,"+op+")";
      else if(n<0) el.style.color="rgba(46,204,113,"+op+")";
      else el.style.color="rgba(255,255,255,0.85)";

      el.style.animation = (abs>=60) ? "pulse 1.2s ease-in-out infinite" : "none";
    }

    async function refresh(){
      try{
        const r=await fetch("/status?_="+Date.now(), { cache:"no-store" });
        const j=await r.json();
        setVal(Number(j?.values?.[FEED]?.ou));
      }catch(e){
        setVal(NaN);
      }
    }
    refresh();
    setInterval(refresh, POLL_MS);
  </script>
</body>
</html>"##;

/// Render the overlay document for one feed.
pub fn overlay_html(feed: Feed) -> String {
    TEMPLATE
        .replace("__FEED__", feed.label())
        .replace("__POLL_MS__", &POLL_MS.to_string())
}
